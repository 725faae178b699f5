//! Dispensing report built from the fulfillment ledger.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db::{Database, DbError};
use crate::ledger::{FulfillmentLedger, LedgerResult};
use crate::models::{Batch, FulfillmentRecord, Medicine};

/// One fulfillment row, enriched for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispensingLine {
    pub fulfillment_id: i64,
    pub request_id: String,
    pub medicine_id: String,
    pub medicine_name: String,
    pub batch_id: String,
    pub expiry_date: String,
    pub quantity: u32,
    pub dispensed_at: String,
    /// Ledger hash for audit cross-reference
    pub entry_hash: String,
}

/// Dispensing report for one request or the whole ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispensingReport {
    /// Export timestamp
    pub exported_at: String,
    /// Request filter, if the report covers a single request
    pub request_id: Option<String>,
    pub lines: Vec<DispensingLine>,
    /// Units across all lines
    pub total_quantity: u64,
    /// Head of the ledger hash chain at export time
    pub ledger_head: Option<String>,
    /// Whether the chain verified when the report was built
    pub ledger_intact: bool,
}

impl DispensingReport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("fulfillment_id,request_id,medicine_id,medicine_name,batch_id,expiry_date,quantity,dispensed_at,entry_hash\n");

        for line in &self.lines {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                line.fulfillment_id,
                escape_csv(&line.request_id),
                escape_csv(&line.medicine_id),
                escape_csv(&line.medicine_name),
                escape_csv(&line.batch_id),
                line.expiry_date,
                line.quantity,
                escape_csv(&line.dispensed_at),
                line.entry_hash,
            ));
        }

        csv
    }
}

/// Dispensing exporter.
pub struct DispensingExporter<'a> {
    db: &'a Database,
    ledger: FulfillmentLedger<'a>,
}

impl<'a> DispensingExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            ledger: FulfillmentLedger::new(db),
        }
    }

    /// Report every fulfillment for one request.
    pub fn export_request(&self, request_id: &str) -> LedgerResult<DispensingReport> {
        let records = self.ledger.records_for_request(request_id)?;
        self.build(Some(request_id.to_string()), records)
    }

    /// Report the whole ledger.
    pub fn export_all(&self) -> LedgerResult<DispensingReport> {
        let records = self.db.list_fulfillments()?;
        self.build(None, records)
    }

    fn build(
        &self,
        request_id: Option<String>,
        records: Vec<FulfillmentRecord>,
    ) -> LedgerResult<DispensingReport> {
        let mut medicines: HashMap<String, Medicine> = HashMap::new();
        let mut batches: HashMap<String, Batch> = HashMap::new();
        let mut lines = Vec::with_capacity(records.len());

        for record in records {
            if !medicines.contains_key(&record.medicine_id) {
                let medicine = self
                    .db
                    .get_medicine(&record.medicine_id)?
                    .ok_or_else(|| DbError::NotFound(format!("medicine {}", record.medicine_id)))?;
                medicines.insert(record.medicine_id.clone(), medicine);
            }
            if !batches.contains_key(&record.batch_id) {
                let batch = self
                    .db
                    .get_batch(&record.batch_id)?
                    .ok_or_else(|| DbError::NotFound(format!("batch {}", record.batch_id)))?;
                batches.insert(record.batch_id.clone(), batch);
            }

            lines.push(DispensingLine {
                fulfillment_id: record.fulfillment_id,
                medicine_name: medicines
                    .get(&record.medicine_id)
                    .map(|m| m.name.clone())
                    .unwrap_or_default(),
                expiry_date: batches
                    .get(&record.batch_id)
                    .map(|b| b.expiry_date.to_string())
                    .unwrap_or_default(),
                request_id: record.request_id,
                medicine_id: record.medicine_id,
                batch_id: record.batch_id,
                quantity: record.quantity,
                dispensed_at: record.created_at,
                entry_hash: record.entry_hash,
            });
        }

        let chain = self.ledger.verify()?;
        Ok(DispensingReport {
            exported_at: chrono::Utc::now().to_rfc3339(),
            request_id,
            total_quantity: lines.iter().map(|l| u64::from(l.quantity)).sum(),
            lines,
            ledger_intact: chain.is_intact(),
            ledger_head: chain.head_hash,
        })
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
