//! In-memory stock store for tests and embedding without SQLite.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::{DbError, DbResult};
use crate::ledger::chain_hash;
use crate::models::{Batch, FulfillmentRecord, Medicine, NewBatch, NewFulfillment};

use super::{StockStore, StockTransaction};

#[derive(Debug, Clone, Default)]
struct State {
    medicines: BTreeMap<String, Medicine>,
    batches: BTreeMap<String, Batch>,
    fulfillments: Vec<FulfillmentRecord>,
}

#[derive(Debug, Default)]
struct Shared {
    state: State,
    /// Fail the Nth write (decrement or append) of the next transactions
    fail_after_writes: Option<usize>,
    /// Fail the next commit
    fail_commit: bool,
}

/// Mutex-guarded store; clones share the same data.
///
/// A transaction holds the lock for its whole lifetime and works on a
/// staged copy that replaces the shared state only on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_medicine(&self, medicine: Medicine) -> DbResult<()> {
        let mut shared = self.lock()?;
        if shared.state.medicines.contains_key(&medicine.medicine_id) {
            return Err(DbError::Constraint(format!(
                "medicine {} already exists",
                medicine.medicine_id
            )));
        }
        shared
            .state
            .medicines
            .insert(medicine.medicine_id.clone(), medicine);
        Ok(())
    }

    pub fn receive_batch(&self, new_batch: NewBatch) -> DbResult<Batch> {
        if new_batch.quantity == 0 {
            return Err(DbError::Constraint(
                "received quantity must be positive".into(),
            ));
        }
        let mut shared = self.lock()?;
        if !shared.state.medicines.contains_key(&new_batch.medicine_id) {
            return Err(DbError::NotFound(format!(
                "medicine {}",
                new_batch.medicine_id
            )));
        }
        let batch = new_batch.into_batch();
        if shared.state.batches.contains_key(&batch.batch_id) {
            return Err(DbError::Constraint(format!(
                "batch {} already exists",
                batch.batch_id
            )));
        }
        shared
            .state
            .batches
            .insert(batch.batch_id.clone(), batch.clone());
        Ok(batch)
    }

    /// Snapshot of a medicine's batches in FEFO order.
    pub fn batches(&self, medicine_id: &str) -> DbResult<Vec<Batch>> {
        let shared = self.lock()?;
        let mut batches: Vec<Batch> = shared
            .state
            .batches
            .values()
            .filter(|b| b.medicine_id == medicine_id)
            .cloned()
            .collect();
        batches.sort_by(Batch::fefo_cmp);
        Ok(batches)
    }

    /// Snapshot of the fulfillment ledger in insertion order.
    pub fn fulfillments(&self) -> DbResult<Vec<FulfillmentRecord>> {
        Ok(self.lock()?.state.fulfillments.clone())
    }

    /// Make the `writes`-th write of the next transaction fail (1-based).
    pub fn fail_after_writes(&self, writes: usize) -> DbResult<()> {
        self.lock()?.fail_after_writes = Some(writes);
        Ok(())
    }

    /// Make the next commit fail.
    pub fn fail_next_commit(&self) -> DbResult<()> {
        self.lock()?.fail_commit = true;
        Ok(())
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Shared>> {
        self.shared
            .lock()
            .map_err(|e| DbError::Unavailable(format!("lock poisoned: {e}")))
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTransaction<'a> {
    guard: MutexGuard<'a, Shared>,
    staged: State,
}

impl InMemoryTransaction<'_> {
    fn count_write(&mut self) -> DbResult<()> {
        match self.guard.fail_after_writes {
            Some(1) => {
                self.guard.fail_after_writes = None;
                Err(DbError::Unavailable("injected write failure".into()))
            }
            Some(n) => {
                self.guard.fail_after_writes = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl StockStore for InMemoryStore {
    type Tx<'a> = InMemoryTransaction<'a>;

    fn begin(&self) -> DbResult<Self::Tx<'_>> {
        let guard = self.lock()?;
        let staged = guard.state.clone();
        Ok(InMemoryTransaction { guard, staged })
    }
}

impl StockTransaction for InMemoryTransaction<'_> {
    fn medicine_exists(&self, medicine_id: &str) -> DbResult<bool> {
        Ok(self.staged.medicines.contains_key(medicine_id))
    }

    fn batches_for_medicine(&self, medicine_id: &str) -> DbResult<Vec<Batch>> {
        Ok(self
            .staged
            .batches
            .values()
            .filter(|b| b.medicine_id == medicine_id)
            .cloned()
            .collect())
    }

    fn decrement_batch(&mut self, batch_id: &str, quantity: u32) -> DbResult<()> {
        self.count_write()?;
        let batch = self
            .staged
            .batches
            .get_mut(batch_id)
            .ok_or_else(|| DbError::NotFound(format!("batch {batch_id}")))?;
        batch.quantity_available = batch
            .quantity_available
            .checked_sub(quantity)
            .ok_or_else(|| {
                DbError::Constraint(format!("batch {batch_id} cannot supply {quantity} units"))
            })?;
        Ok(())
    }

    fn append_fulfillment(&mut self, entry: &NewFulfillment) -> DbResult<FulfillmentRecord> {
        self.count_write()?;
        if entry.quantity == 0 {
            return Err(DbError::Constraint("fulfillment quantity must be positive".into()));
        }
        if !self.staged.batches.contains_key(&entry.batch_id) {
            return Err(DbError::NotFound(format!("batch {}", entry.batch_id)));
        }
        let prev_hash = self
            .staged
            .fulfillments
            .last()
            .map(|r| r.entry_hash.clone())
            .unwrap_or_default();
        let entry_hash = chain_hash(&prev_hash, entry)?;
        let record = FulfillmentRecord {
            fulfillment_id: self.staged.fulfillments.len() as i64 + 1,
            request_id: entry.request_id.clone(),
            batch_id: entry.batch_id.clone(),
            medicine_id: entry.medicine_id.clone(),
            quantity: entry.quantity,
            created_at: entry.created_at.clone(),
            prev_hash,
            entry_hash,
        };
        self.staged.fulfillments.push(record.clone());
        Ok(record)
    }

    fn commit(mut self) -> DbResult<()> {
        if self.guard.fail_commit {
            self.guard.fail_commit = false;
            return Err(DbError::Unavailable("injected commit failure".into()));
        }
        self.guard.state = self.staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_medicine(Medicine::with_id("med-1".into(), "Paracetamol".into()))
            .unwrap();
        store
            .receive_batch(
                NewBatch::new(
                    "med-1",
                    10,
                    NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                )
                .with_batch_id("B1"),
            )
            .unwrap();
        store
    }

    fn entry(quantity: u32) -> NewFulfillment {
        NewFulfillment {
            request_id: "req-1".into(),
            batch_id: "B1".into(),
            medicine_id: "med-1".into(),
            quantity,
            created_at: "2025-03-01T08:00:00+00:00".into(),
        }
    }

    #[test]
    fn test_commit_publishes_staged_state() {
        let store = setup_store();
        let mut tx = store.begin().unwrap();
        tx.decrement_batch("B1", 4).unwrap();
        tx.append_fulfillment(&entry(4)).unwrap();
        tx.commit().unwrap();

        assert_eq!(store.batches("med-1").unwrap()[0].quantity_available, 6);
        assert_eq!(store.fulfillments().unwrap().len(), 1);
    }

    #[test]
    fn test_drop_discards_changes() {
        let store = setup_store();
        {
            let mut tx = store.begin().unwrap();
            tx.decrement_batch("B1", 4).unwrap();
        }
        assert_eq!(store.batches("med-1").unwrap()[0].quantity_available, 10);
    }

    #[test]
    fn test_decrement_cannot_overdraw() {
        let store = setup_store();
        let mut tx = store.begin().unwrap();
        assert!(matches!(
            tx.decrement_batch("B1", 11),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_injected_write_failure_is_one_shot() {
        let store = setup_store();
        store.fail_after_writes(2).unwrap();

        let mut tx = store.begin().unwrap();
        tx.decrement_batch("B1", 1).unwrap();
        assert!(matches!(
            tx.append_fulfillment(&entry(1)),
            Err(DbError::Unavailable(_))
        ));
        drop(tx);

        let mut tx = store.begin().unwrap();
        tx.decrement_batch("B1", 1).unwrap();
        tx.append_fulfillment(&entry(1)).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.fulfillments().unwrap().len(), 1);
    }

    #[test]
    fn test_injected_commit_failure() {
        let store = setup_store();
        store.fail_next_commit().unwrap();

        let mut tx = store.begin().unwrap();
        tx.decrement_batch("B1", 3).unwrap();
        assert!(tx.commit().is_err());
        assert_eq!(store.batches("med-1").unwrap()[0].quantity_available, 10);
    }
}
