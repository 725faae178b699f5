//! Barangay Pharmacy Core Library
//!
//! FEFO (first-expired-first-out) medicine batch allocation with an
//! append-only, hash-chained fulfillment ledger.
//!
//! # Architecture
//!
//! ```text
//!     Request approval / walk-in dispensing (caller)
//!                         │
//!                allocate(medicine, qty, request)
//!                         │
//!        ┌────────────────▼────────────────┐
//!        │   Allocator (one transaction)   │
//!        │   re-read batches               │
//!        │   plan_allocation (pure FEFO)   │
//!        │   decrement + append ledger     │
//!        └────────────────┬────────────────┘
//!                         │
//!           ┌─────────────┴─────────────┐
//!           ▼                           ▼
//!     Batch Ledger               Fulfillment Ledger
//!   (quantity on hand)       (request, batch, qty) rows
//!                                       │
//!                              Dispensing reports
//! ```
//!
//! # Core Principle
//!
//! **Stock is never oversold.** The plan is computed inside the same write
//! transaction that applies it; a failed call changes nothing.
//!
//! # Modules
//!
//! - [`allocation`]: FEFO selector and transactional executor
//! - [`store`]: unit-of-work traits and an in-memory store
//! - [`db`]: SQLite storage for medicines, batches and fulfillments
//! - [`ledger`]: dispensed totals and hash-chain verification
//! - [`export`]: dispensing reports
//! - [`config`]: storage configuration

pub mod allocation;
pub mod config;
pub mod db;
pub mod export;
pub mod ledger;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use allocation::{plan_allocation, AllocationError, AllocationPlan, Allocator};
pub use config::{ConfigError, StoreConfig};
pub use db::Database;
pub use ledger::{ChainReport, FulfillmentLedger};
pub use models::{
    AllocationOutcome, AllocationRequest, Batch, FulfillmentRecord, Medicine, NewBatch,
    PlannedDraw,
};
pub use store::{InMemoryStore, StockStore, StockTransaction};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PharmacyError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage busy: {0}")]
    Busy(String),
}

impl From<db::DbError> for PharmacyError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => PharmacyError::NotFound(what),
            db::DbError::Constraint(msg) => PharmacyError::InvalidInput(msg),
            other => PharmacyError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PharmacyError {
    fn from(e: serde_json::Error) -> Self {
        PharmacyError::SerializationError(e.to_string())
    }
}

impl From<AllocationError> for PharmacyError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::InvalidQuantity => PharmacyError::InvalidInput(e.to_string()),
            AllocationError::UnknownMedicine(id) => PharmacyError::NotFound(format!("medicine {id}")),
            AllocationError::Storage(db_error) => db_error.into(),
            AllocationError::Contention { .. } => PharmacyError::Busy(e.to_string()),
        }
    }
}

impl From<ledger::LedgerError> for PharmacyError {
    fn from(e: ledger::LedgerError) -> Self {
        match e {
            ledger::LedgerError::Database(db_error) => db_error.into(),
            ledger::LedgerError::Json(json_error) => json_error.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for PharmacyError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PharmacyError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

fn parse_ffi_date(raw: &str) -> Result<NaiveDate, PharmacyError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| PharmacyError::InvalidInput(format!("date {raw:?}: {e}")))
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<PharmacyCore>, PharmacyError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(PharmacyCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Open a database from a JSON `StoreConfig`.
#[uniffi::export]
pub fn open_database_with_config(config_json: String) -> Result<Arc<PharmacyCore>, PharmacyError> {
    let config = StoreConfig::from_json(&config_json)?;
    let db = Database::open_with_config(config)?;
    Ok(Arc::new(PharmacyCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<PharmacyCore>, PharmacyError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(PharmacyCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct PharmacyCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl PharmacyCore {
    // =========================================================================
    // Stock Receiving
    // =========================================================================

    /// Register a medicine.
    pub fn add_medicine(&self, name: String) -> Result<FfiMedicine, PharmacyError> {
        let db = self.db.lock()?;
        let medicine = Medicine::new(name);
        db.insert_medicine(&medicine)?;
        Ok(medicine.into())
    }

    /// List registered medicines.
    pub fn list_medicines(&self) -> Result<Vec<FfiMedicine>, PharmacyError> {
        let db = self.db.lock()?;
        Ok(db.list_medicines()?.into_iter().map(|m| m.into()).collect())
    }

    /// Receive stock into a new batch.
    pub fn receive_batch(&self, batch: FfiNewBatch) -> Result<FfiBatch, PharmacyError> {
        let new_batch = NewBatch {
            batch_id: batch.batch_id,
            medicine_id: batch.medicine_id,
            quantity: batch.quantity,
            expiry_date: parse_ffi_date(&batch.expiry_date)?,
            received_date: parse_ffi_date(&batch.received_date)?,
        };
        let db = self.db.lock()?;
        Ok(db.receive_batch(new_batch)?.into())
    }

    /// All batches of a medicine in FEFO order.
    pub fn list_batches(&self, medicine_id: String) -> Result<Vec<FfiBatch>, PharmacyError> {
        let db = self.db.lock()?;
        Ok(db
            .list_batches(&medicine_id)?
            .into_iter()
            .map(|b| b.into())
            .collect())
    }

    /// Units dispensable today.
    pub fn available_stock(&self, medicine_id: String) -> Result<u64, PharmacyError> {
        let db = self.db.lock()?;
        let today = chrono::Local::now().date_naive();
        Ok(db.available_stock(&medicine_id, today)?)
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Draw stock FEFO for a request. A short `allocated` is not an error.
    pub fn allocate(
        &self,
        medicine_id: String,
        quantity: u32,
        request_id: String,
    ) -> Result<FfiAllocationOutcome, PharmacyError> {
        let db = self.db.lock()?;
        let request = AllocationRequest::new(medicine_id, quantity, request_id);
        Ok(db.allocator().execute(&request)?.into())
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Units dispensed under a request.
    pub fn dispensed_for_request(&self, request_id: String) -> Result<u64, PharmacyError> {
        let db = self.db.lock()?;
        Ok(FulfillmentLedger::new(&db).dispensed_for_request(&request_id)?)
    }

    /// Units of a medicine dispensed overall.
    pub fn dispensed_for_medicine(&self, medicine_id: String) -> Result<u64, PharmacyError> {
        let db = self.db.lock()?;
        Ok(FulfillmentLedger::new(&db).dispensed_for_medicine(&medicine_id)?)
    }

    /// Units of a medicine dispensed under one request.
    pub fn dispensed_for_medicine_request(
        &self,
        medicine_id: String,
        request_id: String,
    ) -> Result<u64, PharmacyError> {
        let db = self.db.lock()?;
        Ok(FulfillmentLedger::new(&db).dispensed_for_medicine_request(&medicine_id, &request_id)?)
    }

    /// Check the fulfillment hash chain.
    pub fn verify_ledger(&self) -> Result<bool, PharmacyError> {
        let db = self.db.lock()?;
        Ok(FulfillmentLedger::new(&db).verify()?.is_intact())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export the dispensing report as JSON.
    pub fn export_dispensing_json(&self) -> Result<String, PharmacyError> {
        let db = self.db.lock()?;
        let report = export::DispensingExporter::new(&db).export_all()?;
        Ok(report.to_json()?)
    }

    /// Export the dispensing report as CSV.
    pub fn export_dispensing_csv(&self) -> Result<String, PharmacyError> {
        let db = self.db.lock()?;
        let report = export::DispensingExporter::new(&db).export_all()?;
        Ok(report.to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicine {
    pub medicine_id: String,
    pub name: String,
}

impl From<Medicine> for FfiMedicine {
    fn from(medicine: Medicine) -> Self {
        Self {
            medicine_id: medicine.medicine_id,
            name: medicine.name,
        }
    }
}

/// FFI-safe stock receipt. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewBatch {
    pub batch_id: Option<String>,
    pub medicine_id: String,
    pub quantity: u32,
    pub expiry_date: String,
    pub received_date: String,
}

/// FFI-safe batch.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBatch {
    pub batch_id: String,
    pub medicine_id: String,
    pub quantity_available: u32,
    pub quantity_total: Option<u32>,
    pub expiry_date: String,
    pub received_date: String,
}

impl From<Batch> for FfiBatch {
    fn from(batch: Batch) -> Self {
        Self {
            batch_id: batch.batch_id,
            medicine_id: batch.medicine_id,
            quantity_available: batch.quantity_available,
            quantity_total: batch.quantity_total,
            expiry_date: batch.expiry_date.to_string(),
            received_date: batch.received_date.to_string(),
        }
    }
}

/// FFI-safe draw.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDraw {
    pub batch_id: String,
    pub quantity: u32,
}

/// FFI-safe allocation outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAllocationOutcome {
    pub request_id: String,
    pub medicine_id: String,
    pub requested: u32,
    pub allocated: u32,
    pub shortfall: u32,
    pub draws: Vec<FfiDraw>,
}

impl From<AllocationOutcome> for FfiAllocationOutcome {
    fn from(outcome: AllocationOutcome) -> Self {
        Self {
            shortfall: outcome.shortfall(),
            request_id: outcome.request_id,
            medicine_id: outcome.medicine_id,
            requested: outcome.requested,
            allocated: outcome.allocated,
            draws: outcome
                .draws
                .into_iter()
                .map(|d| FfiDraw {
                    batch_id: d.batch_id,
                    quantity: d.quantity,
                })
                .collect(),
        }
    }
}
