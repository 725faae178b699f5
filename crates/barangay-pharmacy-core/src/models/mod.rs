//! Domain models for the barangay pharmacy.

mod allocation;
mod fulfillment;
mod medicine;

pub use allocation::*;
pub use fulfillment::*;
pub use medicine::*;
