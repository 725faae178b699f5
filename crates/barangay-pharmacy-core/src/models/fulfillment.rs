//! Fulfillment ledger models.

use serde::{Deserialize, Serialize};

/// An append-only audit row: `quantity` units of `batch_id` went to `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FulfillmentRecord {
    /// Ledger sequence number (insertion order)
    pub fulfillment_id: i64,
    pub request_id: String,
    pub batch_id: String,
    pub medicine_id: String,
    pub quantity: u32,
    pub created_at: String,
    /// Hash of the previous record ("" for the first)
    pub prev_hash: String,
    /// sha256(prev_hash || canonical payload), hex encoded
    pub entry_hash: String,
}

impl FulfillmentRecord {
    /// The payload that was hashed when this record was written.
    pub fn payload(&self) -> NewFulfillment {
        NewFulfillment {
            request_id: self.request_id.clone(),
            batch_id: self.batch_id.clone(),
            medicine_id: self.medicine_id.clone(),
            quantity: self.quantity,
            created_at: self.created_at.clone(),
        }
    }
}

/// A fulfillment row before it is sequenced and chained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewFulfillment {
    pub request_id: String,
    pub batch_id: String,
    pub medicine_id: String,
    pub quantity: u32,
    pub created_at: String,
}

impl NewFulfillment {
    /// Serialize to canonical JSON for ledger hashing.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        // Field order is fixed by the struct definition
        serde_json::to_string(self)
    }
}
