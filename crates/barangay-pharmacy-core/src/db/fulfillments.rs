//! Fulfillment ledger database operations.

use rusqlite::{params, Connection, OptionalExtension, Params, Row};

use super::{Database, DbResult};
use crate::ledger::chain_hash;
use crate::models::{FulfillmentRecord, NewFulfillment};

const FULFILLMENT_COLUMNS: &str =
    "fulfillment_id, request_id, batch_id, medicine_id, quantity, created_at, prev_hash, entry_hash";

impl Database {
    /// All fulfillment records in ledger order.
    pub fn list_fulfillments(&self) -> DbResult<Vec<FulfillmentRecord>> {
        let sql = format!("SELECT {FULFILLMENT_COLUMNS} FROM fulfillments ORDER BY fulfillment_id");
        query_fulfillments(&self.conn, &sql, [])
    }

    /// Fulfillment records for one owning request.
    pub fn fulfillments_for_request(&self, request_id: &str) -> DbResult<Vec<FulfillmentRecord>> {
        let sql = format!(
            "SELECT {FULFILLMENT_COLUMNS} FROM fulfillments WHERE request_id = ? ORDER BY fulfillment_id"
        );
        query_fulfillments(&self.conn, &sql, [request_id])
    }

    /// Fulfillment records drawn from one batch.
    pub fn fulfillments_for_batch(&self, batch_id: &str) -> DbResult<Vec<FulfillmentRecord>> {
        let sql = format!(
            "SELECT {FULFILLMENT_COLUMNS} FROM fulfillments WHERE batch_id = ? ORDER BY fulfillment_id"
        );
        query_fulfillments(&self.conn, &sql, [batch_id])
    }

    /// Fulfillment records for one medicine.
    pub fn fulfillments_for_medicine(&self, medicine_id: &str) -> DbResult<Vec<FulfillmentRecord>> {
        let sql = format!(
            "SELECT {FULFILLMENT_COLUMNS} FROM fulfillments WHERE medicine_id = ? ORDER BY fulfillment_id"
        );
        query_fulfillments(&self.conn, &sql, [medicine_id])
    }

    /// Sum of fulfillment quantities matching `column = value`.
    pub(crate) fn sum_fulfillments_by(&self, column: SumColumn, value: &str) -> DbResult<u64> {
        let sql = format!(
            "SELECT COALESCE(SUM(quantity), 0) FROM fulfillments WHERE {} = ?",
            column.as_str()
        );
        self.conn
            .query_row(&sql, [value], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Sum of fulfillment quantities for one medicine under one request.
    pub(crate) fn sum_fulfillments_for_medicine_request(
        &self,
        medicine_id: &str,
        request_id: &str,
    ) -> DbResult<u64> {
        self.conn
            .query_row(
                r#"
                SELECT COALESCE(SUM(quantity), 0) FROM fulfillments
                WHERE medicine_id = ?1 AND request_id = ?2
                "#,
                params![medicine_id, request_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Sum of every fulfillment quantity.
    pub(crate) fn sum_all_fulfillments(&self) -> DbResult<u64> {
        self.conn
            .query_row("SELECT COALESCE(SUM(quantity), 0) FROM fulfillments", [], |row| {
                row.get(0)
            })
            .map_err(Into::into)
    }
}

/// Columns the ledger may aggregate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SumColumn {
    Request,
    Medicine,
    Batch,
}

impl SumColumn {
    fn as_str(self) -> &'static str {
        match self {
            SumColumn::Request => "request_id",
            SumColumn::Medicine => "medicine_id",
            SumColumn::Batch => "batch_id",
        }
    }
}

/// Append one record to the chain. Must run inside the allocation transaction.
pub(crate) fn append_fulfillment(
    conn: &Connection,
    entry: &NewFulfillment,
) -> DbResult<FulfillmentRecord> {
    let prev_hash: String = conn
        .query_row(
            "SELECT entry_hash FROM fulfillments ORDER BY fulfillment_id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or_default();
    let entry_hash = chain_hash(&prev_hash, entry)?;

    conn.execute(
        r#"
        INSERT INTO fulfillments (
            request_id, batch_id, medicine_id, quantity, created_at, prev_hash, entry_hash
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            entry.request_id,
            entry.batch_id,
            entry.medicine_id,
            entry.quantity,
            entry.created_at,
            prev_hash,
            entry_hash,
        ],
    )?;

    Ok(FulfillmentRecord {
        fulfillment_id: conn.last_insert_rowid(),
        request_id: entry.request_id.clone(),
        batch_id: entry.batch_id.clone(),
        medicine_id: entry.medicine_id.clone(),
        quantity: entry.quantity,
        created_at: entry.created_at.clone(),
        prev_hash,
        entry_hash,
    })
}

fn query_fulfillments<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> DbResult<Vec<FulfillmentRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, fulfillment_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn fulfillment_from_row(row: &Row<'_>) -> rusqlite::Result<FulfillmentRecord> {
    Ok(FulfillmentRecord {
        fulfillment_id: row.get(0)?,
        request_id: row.get(1)?,
        batch_id: row.get(2)?,
        medicine_id: row.get(3)?,
        quantity: row.get(4)?,
        created_at: row.get(5)?,
        prev_hash: row.get(6)?,
        entry_hash: row.get(7)?,
    })
}
