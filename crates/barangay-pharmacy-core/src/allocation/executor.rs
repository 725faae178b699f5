//! Transactional application of allocation plans.

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::instrument;

use super::{plan_allocation, AllocationError, AllocationResult};
use crate::db::Database;
use crate::models::{AllocationOutcome, AllocationRequest, NewFulfillment};
use crate::store::{StockStore, StockTransaction};

const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Applies FEFO plans to a [`StockStore`], one transaction per call.
pub struct Allocator<'a, S: StockStore> {
    store: &'a S,
    max_conflict_retries: u32,
    today: Option<NaiveDate>,
}

impl<'a, S: StockStore> Allocator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            today: None,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Evaluate expiry against a fixed date instead of the local clock.
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Draw up to `quantity` units for `request_id`; returns units allocated.
    pub fn allocate(
        &self,
        medicine_id: &str,
        quantity: u32,
        request_id: &str,
    ) -> AllocationResult<u32> {
        let request = AllocationRequest::new(medicine_id, quantity, request_id);
        Ok(self.execute(&request)?.allocated)
    }

    /// Run one allocation to completion, retrying on lock contention.
    ///
    /// A failed call leaves no trace in storage, so callers may retry it.
    #[instrument(
        skip(self, request),
        fields(
            medicine_id = %request.medicine_id,
            quantity = request.quantity,
            request_id = %request.request_id,
        )
    )]
    pub fn execute(&self, request: &AllocationRequest) -> AllocationResult<AllocationOutcome> {
        if request.quantity == 0 {
            return Err(AllocationError::InvalidQuantity);
        }
        if request.medicine_id.is_empty() {
            return Err(AllocationError::UnknownMedicine(String::new()));
        }

        let today = self.today();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_execute(request, today) {
                Err(AllocationError::Storage(e)) if e.is_busy() => {
                    if attempt > self.max_conflict_retries {
                        tracing::warn!(attempts = attempt, "allocation abandoned under contention");
                        return Err(AllocationError::Contention { attempts: attempt });
                    }
                    tracing::debug!(attempt, error = %e, "stock locked, retrying allocation");
                    thread::sleep(RETRY_BACKOFF * attempt);
                }
                result => return result,
            }
        }
    }

    fn try_execute(
        &self,
        request: &AllocationRequest,
        today: NaiveDate,
    ) -> AllocationResult<AllocationOutcome> {
        let mut tx = self.store.begin()?;

        if !tx.medicine_exists(&request.medicine_id)? {
            return Err(AllocationError::UnknownMedicine(request.medicine_id.clone()));
        }

        let batches = tx.batches_for_medicine(&request.medicine_id)?;
        let plan = plan_allocation(&request.medicine_id, request.quantity, &batches, today)?;

        let created_at = chrono::Utc::now().to_rfc3339();
        for draw in &plan.draws {
            tx.decrement_batch(&draw.batch_id, draw.quantity)?;
            tx.append_fulfillment(&NewFulfillment {
                request_id: request.request_id.clone(),
                batch_id: draw.batch_id.clone(),
                medicine_id: request.medicine_id.clone(),
                quantity: draw.quantity,
                created_at: created_at.clone(),
            })?;
        }
        tx.commit()?;

        let outcome = AllocationOutcome {
            request_id: request.request_id.clone(),
            medicine_id: request.medicine_id.clone(),
            requested: request.quantity,
            allocated: plan.allocated(),
            draws: plan.draws,
        };
        if outcome.is_complete() {
            tracing::info!(allocated = outcome.allocated, batches = outcome.draws.len(), "allocation committed");
        } else {
            tracing::warn!(
                allocated = outcome.allocated,
                shortfall = outcome.shortfall(),
                "insufficient stock for allocation"
            );
        }
        Ok(outcome)
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

impl Database {
    /// Allocator over this connection using the configured retry budget.
    pub fn allocator(&self) -> Allocator<'_, Database> {
        Allocator::new(self).with_max_conflict_retries(self.config().max_conflict_retries)
    }
}
