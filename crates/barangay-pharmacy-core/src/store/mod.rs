//! Unit-of-work boundary between the allocation engine and storage.
//!
//! The engine only ever talks to a [`StockStore`]: it opens one
//! [`StockTransaction`], reads batches, applies decrements and fulfillment
//! rows, and commits. Dropping a transaction without committing must discard
//! every change made through it.

mod memory;

pub use memory::{InMemoryStore, InMemoryTransaction};

use crate::db::DbResult;
use crate::models::{Batch, FulfillmentRecord, NewFulfillment};

/// Storage that can open allocation transactions.
pub trait StockStore {
    type Tx<'a>: StockTransaction
    where
        Self: 'a;

    /// Begin a transaction that excludes concurrent writers until it ends.
    fn begin(&self) -> DbResult<Self::Tx<'_>>;
}

/// One atomic allocation scope.
pub trait StockTransaction {
    fn medicine_exists(&self, medicine_id: &str) -> DbResult<bool>;

    /// Every batch of the medicine as of this transaction, in any order.
    fn batches_for_medicine(&self, medicine_id: &str) -> DbResult<Vec<Batch>>;

    /// Must fail instead of taking a batch below zero.
    fn decrement_batch(&mut self, batch_id: &str, quantity: u32) -> DbResult<()>;

    fn append_fulfillment(&mut self, entry: &NewFulfillment) -> DbResult<FulfillmentRecord>;

    fn commit(self) -> DbResult<()>;
}
