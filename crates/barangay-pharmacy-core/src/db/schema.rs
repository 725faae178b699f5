//! SQLite schema definition.

/// Complete database schema for the pharmacy stock ledger.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Medicines
-- ============================================================================

CREATE TABLE IF NOT EXISTS medicines (
    medicine_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_medicines_name ON medicines(name);

-- ============================================================================
-- Batches (quantity mutated only by allocation and receiving)
-- ============================================================================

CREATE TABLE IF NOT EXISTS batches (
    batch_id TEXT PRIMARY KEY,
    medicine_id TEXT NOT NULL REFERENCES medicines(medicine_id),
    quantity_available INTEGER NOT NULL CHECK (quantity_available >= 0),
    quantity_total INTEGER CHECK (quantity_total IS NULL OR quantity_total >= 0),
    expiry_date TEXT NOT NULL,                   -- YYYY-MM-DD
    received_date TEXT NOT NULL,                 -- YYYY-MM-DD
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- FEFO scan order
CREATE INDEX IF NOT EXISTS idx_batches_fefo
    ON batches(medicine_id, expiry_date, received_date, batch_id);

-- Empty and expired batches stay for audit history
CREATE TRIGGER IF NOT EXISTS batches_no_delete BEFORE DELETE ON batches
BEGIN
    SELECT RAISE(ABORT, 'Batches are never deleted');
END;

-- ============================================================================
-- Fulfillments (Append-Only - Immutable after creation)
-- ============================================================================

CREATE TABLE IF NOT EXISTS fulfillments (
    fulfillment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id TEXT NOT NULL,
    batch_id TEXT NOT NULL REFERENCES batches(batch_id),
    medicine_id TEXT NOT NULL REFERENCES medicines(medicine_id),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    created_at TEXT NOT NULL,
    prev_hash TEXT NOT NULL,                     -- '' for the first entry
    entry_hash TEXT NOT NULL UNIQUE              -- SHA-256(prev_hash || payload)
);

CREATE INDEX IF NOT EXISTS idx_fulfillments_request ON fulfillments(request_id);
CREATE INDEX IF NOT EXISTS idx_fulfillments_batch ON fulfillments(batch_id);
CREATE INDEX IF NOT EXISTS idx_fulfillments_medicine ON fulfillments(medicine_id);

CREATE TRIGGER IF NOT EXISTS fulfillments_no_update BEFORE UPDATE ON fulfillments
BEGIN
    SELECT RAISE(ABORT, 'Fulfillment records are immutable');
END;

CREATE TRIGGER IF NOT EXISTS fulfillments_no_delete BEFORE DELETE ON fulfillments
BEGIN
    SELECT RAISE(ABORT, 'Fulfillment records are immutable');
END;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO medicines (medicine_id, name) VALUES ('med-1', 'Paracetamol 500mg')",
            [],
        )
        .unwrap();
        conn.execute(
            r#"INSERT INTO batches (batch_id, medicine_id, quantity_available, quantity_total, expiry_date, received_date)
               VALUES ('B1', 'med-1', 5, 5, '2025-01-01', '2024-06-01')"#,
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = setup();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_batch_quantity_cannot_go_negative() {
        let conn = setup();
        let result = conn.execute(
            "UPDATE batches SET quantity_available = quantity_available - 6 WHERE batch_id = 'B1'",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_delete_blocked() {
        let conn = setup();
        let result = conn.execute("DELETE FROM batches WHERE batch_id = 'B1'", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_requires_medicine() {
        let conn = setup();
        let result = conn.execute(
            r#"INSERT INTO batches (batch_id, medicine_id, quantity_available, expiry_date, received_date)
               VALUES ('B2', 'missing', 5, '2025-01-01', '2024-06-01')"#,
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_fulfillment_constraints() {
        let conn = setup();

        // Zero-quantity draws are rejected
        let result = conn.execute(
            r#"INSERT INTO fulfillments (request_id, batch_id, medicine_id, quantity, created_at, prev_hash, entry_hash)
               VALUES ('req-1', 'B1', 'med-1', 0, 'now', '', 'h0')"#,
            [],
        );
        assert!(result.is_err());

        conn.execute(
            r#"INSERT INTO fulfillments (request_id, batch_id, medicine_id, quantity, created_at, prev_hash, entry_hash)
               VALUES ('req-1', 'B1', 'med-1', 2, 'now', '', 'h1')"#,
            [],
        )
        .unwrap();

        // Immutable once written
        let result = conn.execute("UPDATE fulfillments SET quantity = 1", []);
        assert!(result.is_err());
        let result = conn.execute("DELETE FROM fulfillments", []);
        assert!(result.is_err());
    }
}
