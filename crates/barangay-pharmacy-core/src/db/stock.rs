//! SQLite implementation of the allocation unit of work.

use rusqlite::{Transaction, TransactionBehavior};

use super::batches::{batches_for_medicine, decrement_batch};
use super::fulfillments::append_fulfillment;
use super::medicines::medicine_exists;
use super::{Database, DbResult};
use crate::models::{Batch, FulfillmentRecord, NewFulfillment};
use crate::store::{StockStore, StockTransaction};

/// An `IMMEDIATE` transaction: the write lock is held from the first read,
/// so no other connection can commit a decrement between plan and apply.
pub struct SqliteStockTransaction<'a> {
    tx: Transaction<'a>,
}

impl StockStore for Database {
    type Tx<'a> = SqliteStockTransaction<'a>;

    fn begin(&self) -> DbResult<Self::Tx<'_>> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        Ok(SqliteStockTransaction { tx })
    }
}

impl StockTransaction for SqliteStockTransaction<'_> {
    fn medicine_exists(&self, medicine_id: &str) -> DbResult<bool> {
        medicine_exists(&self.tx, medicine_id)
    }

    fn batches_for_medicine(&self, medicine_id: &str) -> DbResult<Vec<Batch>> {
        batches_for_medicine(&self.tx, medicine_id)
    }

    fn decrement_batch(&mut self, batch_id: &str, quantity: u32) -> DbResult<()> {
        decrement_batch(&self.tx, batch_id, quantity)
    }

    fn append_fulfillment(&mut self, entry: &NewFulfillment) -> DbResult<FulfillmentRecord> {
        append_fulfillment(&self.tx, entry)
    }

    fn commit(self) -> DbResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}
