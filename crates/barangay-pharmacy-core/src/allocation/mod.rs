//! FEFO allocation engine.
//!
//! ```text
//! caller ──► Allocator::allocate
//!               │  begin unit of work (write lock)
//!               │  re-read batches
//!               ├─► plan_allocation (pure FEFO plan)
//!               │  decrement batches + append fulfillments
//!               │  commit (or roll back everything)
//!               ▼
//!          allocated quantity
//! ```

mod executor;
mod selector;

pub use executor::*;
pub use selector::*;

use thiserror::Error;

use crate::db::DbError;

/// Allocation errors.
///
/// Insufficient stock is not an error; see [`crate::models::AllocationOutcome`].
#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("Requested quantity must be positive")]
    InvalidQuantity,

    #[error("Unknown medicine: {0}")]
    UnknownMedicine(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("Storage stayed locked after {attempts} attempts")]
    Contention { attempts: u32 },
}

pub type AllocationResult<T> = Result<T, AllocationError>;
