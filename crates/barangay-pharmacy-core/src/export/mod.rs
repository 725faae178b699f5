//! Export functionality for dispensing reports.

mod dispensing;

pub use dispensing::*;
