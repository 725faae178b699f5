//! Medicine and batch models.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A medicine in the barangay formulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    /// Unique identifier
    pub medicine_id: String,
    /// Display name (e.g., "Paracetamol 500mg tablet")
    pub name: String,
    /// Creation timestamp
    pub created_at: String,
}

impl Medicine {
    /// Create a new medicine with a generated identifier.
    pub fn new(name: String) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name)
    }

    /// Create a medicine with a caller-chosen identifier.
    pub fn with_id(medicine_id: String, name: String) -> Self {
        Self {
            medicine_id,
            name,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A discrete lot of one medicine with its own expiry and remaining quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Batch {
    /// Unique batch identifier
    pub batch_id: String,
    /// Owning medicine
    pub medicine_id: String,
    /// Units still on hand
    pub quantity_available: u32,
    /// Units originally received (reporting only)
    pub quantity_total: Option<u32>,
    /// Last day the lot is labelled usable; ineligible from this date on
    pub expiry_date: NaiveDate,
    /// Day the lot was received into stock
    pub received_date: NaiveDate,
}

impl Batch {
    /// A batch is expired once its expiry date is on or before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date <= today
    }

    /// Whether the batch can supply stock on `today`.
    pub fn is_eligible(&self, today: NaiveDate) -> bool {
        self.quantity_available > 0 && !self.is_expired(today)
    }

    /// Total FEFO order: expiry, then received date, then batch id.
    pub fn fefo_cmp(&self, other: &Batch) -> Ordering {
        self.expiry_date
            .cmp(&other.expiry_date)
            .then_with(|| self.received_date.cmp(&other.received_date))
            .then_with(|| self.batch_id.cmp(&other.batch_id))
    }
}

/// Stock being received into a new batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBatch {
    /// Explicit batch id; generated when `None`
    pub batch_id: Option<String>,
    pub medicine_id: String,
    pub quantity: u32,
    pub expiry_date: NaiveDate,
    pub received_date: NaiveDate,
}

impl NewBatch {
    pub fn new(
        medicine_id: impl Into<String>,
        quantity: u32,
        expiry_date: NaiveDate,
        received_date: NaiveDate,
    ) -> Self {
        Self {
            batch_id: None,
            medicine_id: medicine_id.into(),
            quantity,
            expiry_date,
            received_date,
        }
    }

    /// Use a fixed batch id instead of a generated one.
    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    /// Materialize the batch as it will be stored.
    pub fn into_batch(self) -> Batch {
        Batch {
            batch_id: self
                .batch_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            medicine_id: self.medicine_id,
            quantity_available: self.quantity,
            quantity_total: Some(self.quantity),
            expiry_date: self.expiry_date,
            received_date: self.received_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(id: &str, qty: u32, expiry: NaiveDate, received: NaiveDate) -> Batch {
        NewBatch::new("med-1", qty, expiry, received)
            .with_batch_id(id)
            .into_batch()
    }

    #[test]
    fn test_expires_on_expiry_date() {
        let b = batch("B1", 5, date(2025, 1, 1), date(2024, 6, 1));
        assert!(!b.is_expired(date(2024, 12, 31)));
        assert!(b.is_expired(date(2025, 1, 1)));
        assert!(b.is_expired(date(2025, 1, 2)));
    }

    #[test]
    fn test_empty_batch_is_inert() {
        let mut b = batch("B1", 5, date(2025, 1, 1), date(2024, 6, 1));
        assert!(b.is_eligible(date(2024, 7, 1)));
        b.quantity_available = 0;
        assert!(!b.is_eligible(date(2024, 7, 1)));
    }

    #[test]
    fn test_fefo_ordering_tie_breaks() {
        let a = batch("B2", 5, date(2025, 1, 1), date(2024, 1, 1));
        let b = batch("B1", 5, date(2025, 1, 1), date(2024, 2, 1));
        let c = batch("B0", 5, date(2025, 1, 1), date(2024, 2, 1));
        let d = batch("A0", 5, date(2025, 3, 1), date(2023, 1, 1));

        let mut batches = vec![d.clone(), b.clone(), c.clone(), a.clone()];
        batches.sort_by(Batch::fefo_cmp);
        let ids: Vec<_> = batches.iter().map(|b| b.batch_id.as_str()).collect();
        assert_eq!(ids, vec!["B2", "B0", "B1", "A0"]);
    }

    #[test]
    fn test_new_batch_records_total() {
        let b = NewBatch::new("med-1", 40, date(2026, 1, 1), date(2025, 1, 1)).into_batch();
        assert_eq!(b.quantity_available, 40);
        assert_eq!(b.quantity_total, Some(40));
        assert_eq!(b.batch_id.len(), 36); // UUID format
    }
}
