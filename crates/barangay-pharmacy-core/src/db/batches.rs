//! Batch database operations.

use chrono::{Days, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

use super::{format_date, parse_date, Database, DbError, DbResult};
use crate::models::{Batch, NewBatch};

const BATCH_COLUMNS: &str = "batch_id, medicine_id, quantity_available, quantity_total, expiry_date, received_date";

impl Database {
    /// Receive stock into a new batch.
    pub fn receive_batch(&self, new_batch: NewBatch) -> DbResult<Batch> {
        if new_batch.quantity == 0 {
            return Err(DbError::Constraint(
                "received quantity must be positive".into(),
            ));
        }
        if self.get_medicine(&new_batch.medicine_id)?.is_none() {
            return Err(DbError::NotFound(format!(
                "medicine {}",
                new_batch.medicine_id
            )));
        }

        let batch = new_batch.into_batch();
        self.conn.execute(
            r#"
            INSERT INTO batches (
                batch_id, medicine_id, quantity_available, quantity_total,
                expiry_date, received_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                batch.batch_id,
                batch.medicine_id,
                batch.quantity_available,
                batch.quantity_total,
                format_date(batch.expiry_date),
                format_date(batch.received_date),
            ],
        )?;
        tracing::info!(
            batch_id = %batch.batch_id,
            medicine_id = %batch.medicine_id,
            quantity = batch.quantity_available,
            expiry = %batch.expiry_date,
            "received batch"
        );
        Ok(batch)
    }

    /// Get a batch by ID.
    pub fn get_batch(&self, batch_id: &str) -> DbResult<Option<Batch>> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE batch_id = ?");
        self.conn
            .query_row(&sql, [batch_id], BatchRow::from_row)
            .optional()?
            .map(Batch::try_from)
            .transpose()
    }

    /// Every batch of a medicine in FEFO order, including empty and expired ones.
    pub fn list_batches(&self, medicine_id: &str) -> DbResult<Vec<Batch>> {
        batches_for_medicine(&self.conn, medicine_id)
    }

    /// Batches that could supply stock on `today`, in FEFO order.
    pub fn eligible_batches(&self, medicine_id: &str, today: NaiveDate) -> DbResult<Vec<Batch>> {
        let sql = format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM batches
            WHERE medicine_id = ?1 AND quantity_available > 0 AND expiry_date > ?2
            ORDER BY expiry_date, received_date, batch_id
            "#
        );
        query_batches(&self.conn, &sql, params![medicine_id, format_date(today)])
    }

    /// Units that can still be dispensed on `today`.
    pub fn available_stock(&self, medicine_id: &str, today: NaiveDate) -> DbResult<u64> {
        self.conn
            .query_row(
                r#"
                SELECT COALESCE(SUM(quantity_available), 0) FROM batches
                WHERE medicine_id = ?1 AND expiry_date > ?2
                "#,
                params![medicine_id, format_date(today)],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Units frozen in batches that have expired by `today`.
    pub fn expired_stock(&self, medicine_id: &str, today: NaiveDate) -> DbResult<u64> {
        self.conn
            .query_row(
                r#"
                SELECT COALESCE(SUM(quantity_available), 0) FROM batches
                WHERE medicine_id = ?1 AND expiry_date <= ?2
                "#,
                params![medicine_id, format_date(today)],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Eligible batches of any medicine expiring within `within_days` of `today`.
    pub fn expiring_batches(&self, today: NaiveDate, within_days: u32) -> DbResult<Vec<Batch>> {
        // Stored dates are four-digit years; later horizons would not sort as text.
        let last_storable = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX);
        let horizon = today
            .checked_add_days(Days::new(u64::from(within_days)))
            .map_or(last_storable, |date| date.min(last_storable));
        let sql = format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM batches
            WHERE quantity_available > 0 AND expiry_date > ?1 AND expiry_date <= ?2
            ORDER BY expiry_date, received_date, batch_id
            "#
        );
        query_batches(
            &self.conn,
            &sql,
            params![format_date(today), format_date(horizon)],
        )
    }
}

pub(crate) fn batches_for_medicine(conn: &Connection, medicine_id: &str) -> DbResult<Vec<Batch>> {
    let sql = format!(
        r#"
        SELECT {BATCH_COLUMNS} FROM batches
        WHERE medicine_id = ?
        ORDER BY expiry_date, received_date, batch_id
        "#
    );
    query_batches(conn, &sql, [medicine_id])
}

/// Take `quantity` units from a batch; fails rather than going negative.
pub(crate) fn decrement_batch(conn: &Connection, batch_id: &str, quantity: u32) -> DbResult<()> {
    let rows_affected = conn.execute(
        r#"
        UPDATE batches SET
            quantity_available = quantity_available - ?1,
            updated_at = datetime('now')
        WHERE batch_id = ?2 AND quantity_available >= ?1
        "#,
        params![quantity, batch_id],
    )?;
    if rows_affected == 0 {
        return Err(DbError::Constraint(format!(
            "batch {batch_id} cannot supply {quantity} units"
        )));
    }
    Ok(())
}

fn query_batches<P: Params>(conn: &Connection, sql: &str, params: P) -> DbResult<Vec<Batch>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, BatchRow::from_row)?;

    let mut batches = Vec::new();
    for row in rows {
        batches.push(row?.try_into()?);
    }
    Ok(batches)
}

/// Intermediate row struct for database mapping.
struct BatchRow {
    batch_id: String,
    medicine_id: String,
    quantity_available: u32,
    quantity_total: Option<u32>,
    expiry_date: String,
    received_date: String,
}

impl BatchRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            batch_id: row.get(0)?,
            medicine_id: row.get(1)?,
            quantity_available: row.get(2)?,
            quantity_total: row.get(3)?,
            expiry_date: row.get(4)?,
            received_date: row.get(5)?,
        })
    }
}

impl TryFrom<BatchRow> for Batch {
    type Error = DbError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        Ok(Batch {
            batch_id: row.batch_id,
            medicine_id: row.medicine_id,
            quantity_available: row.quantity_available,
            quantity_total: row.quantity_total,
            expiry_date: parse_date(&row.expiry_date)?,
            received_date: parse_date(&row.received_date)?,
        })
    }
}
