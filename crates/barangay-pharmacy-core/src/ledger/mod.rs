//! Fulfillment Ledger: dispensed totals and audit verification.
//!
//! The ledger is the source of truth for "how much was dispensed", kept
//! apart from any request status flags so totals survive status edits.

mod chain;

pub use chain::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Database, DbError, SumColumn};
use crate::models::FulfillmentRecord;

/// Ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Dispensed quantity per batch for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub request_id: String,
    pub total: u64,
    /// (batch_id, quantity) in draw order
    pub draws: Vec<(String, u32)>,
}

/// Read-only view over fulfillment records.
pub struct FulfillmentLedger<'a> {
    db: &'a Database,
}

impl<'a> FulfillmentLedger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Units dispensed under one request.
    pub fn dispensed_for_request(&self, request_id: &str) -> LedgerResult<u64> {
        Ok(self.db.sum_fulfillments_by(SumColumn::Request, request_id)?)
    }

    /// Units of one medicine dispensed overall.
    pub fn dispensed_for_medicine(&self, medicine_id: &str) -> LedgerResult<u64> {
        Ok(self.db.sum_fulfillments_by(SumColumn::Medicine, medicine_id)?)
    }

    /// Units of one medicine dispensed under one request.
    pub fn dispensed_for_medicine_request(
        &self,
        medicine_id: &str,
        request_id: &str,
    ) -> LedgerResult<u64> {
        Ok(self
            .db
            .sum_fulfillments_for_medicine_request(medicine_id, request_id)?)
    }

    /// Units ever drawn from one batch.
    pub fn drawn_from_batch(&self, batch_id: &str) -> LedgerResult<u64> {
        Ok(self.db.sum_fulfillments_by(SumColumn::Batch, batch_id)?)
    }

    /// Units dispensed across all medicines.
    pub fn dispensed_total(&self) -> LedgerResult<u64> {
        Ok(self.db.sum_all_fulfillments()?)
    }

    pub fn records_for_request(&self, request_id: &str) -> LedgerResult<Vec<FulfillmentRecord>> {
        Ok(self.db.fulfillments_for_request(request_id)?)
    }

    pub fn records_for_batch(&self, batch_id: &str) -> LedgerResult<Vec<FulfillmentRecord>> {
        Ok(self.db.fulfillments_for_batch(batch_id)?)
    }

    pub fn summarize_request(&self, request_id: &str) -> LedgerResult<RequestSummary> {
        let records = self.db.fulfillments_for_request(request_id)?;
        Ok(RequestSummary {
            request_id: request_id.to_string(),
            total: records.iter().map(|r| u64::from(r.quantity)).sum(),
            draws: records
                .into_iter()
                .map(|r| (r.batch_id, r.quantity))
                .collect(),
        })
    }

    /// Walk the whole hash chain.
    pub fn verify(&self) -> LedgerResult<ChainReport> {
        let records = self.db.list_fulfillments()?;
        let report = verify_chain(&records)?;
        if let Some(id) = report.first_broken {
            tracing::error!(fulfillment_id = id, "fulfillment ledger chain broken");
        }
        Ok(report)
    }
}
