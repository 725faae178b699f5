//! Allocation request and result models.

use serde::{Deserialize, Serialize};

/// The caller's ask: draw `quantity` units of a medicine for one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllocationRequest {
    pub medicine_id: String,
    pub quantity: u32,
    /// Correlation key written onto every fulfillment row
    pub request_id: String,
}

impl AllocationRequest {
    pub fn new(
        medicine_id: impl Into<String>,
        quantity: u32,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            medicine_id: medicine_id.into(),
            quantity,
            request_id: request_id.into(),
        }
    }
}

/// One step of an allocation plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedDraw {
    pub batch_id: String,
    pub quantity: u32,
}

/// What a committed allocation actually did.
///
/// Insufficient stock is a normal outcome: `allocated < requested`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllocationOutcome {
    pub request_id: String,
    pub medicine_id: String,
    pub requested: u32,
    pub allocated: u32,
    /// Draws in the order they were applied
    pub draws: Vec<PlannedDraw>,
}

impl AllocationOutcome {
    /// Units that could not be supplied.
    pub fn shortfall(&self) -> u32 {
        self.requested.saturating_sub(self.allocated)
    }

    pub fn is_complete(&self) -> bool {
        self.allocated == self.requested
    }

    pub fn is_partial(&self) -> bool {
        self.allocated > 0 && self.allocated < self.requested
    }
}
