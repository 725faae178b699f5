//! Hash chain over fulfillment records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{FulfillmentRecord, NewFulfillment};

/// Hash a fulfillment payload onto the previous entry's hash.
pub fn chain_hash(prev_hash: &str, entry: &NewFulfillment) -> Result<String, serde_json::Error> {
    let payload = entry.to_canonical_json()?;
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(payload.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Outcome of walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    /// Records checked
    pub entries: usize,
    /// Hash of the last record, if any
    pub head_hash: Option<String>,
    /// First record whose link or hash does not match
    pub first_broken: Option<i64>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.first_broken.is_none()
    }
}

/// Recompute every link of a ledger given in insertion order.
pub fn verify_chain(records: &[FulfillmentRecord]) -> Result<ChainReport, serde_json::Error> {
    let mut expected_prev = String::new();

    for record in records {
        let recomputed = chain_hash(&record.prev_hash, &record.payload())?;
        if record.prev_hash != expected_prev || record.entry_hash != recomputed {
            return Ok(ChainReport {
                entries: records.len(),
                head_hash: records.last().map(|r| r.entry_hash.clone()),
                first_broken: Some(record.fulfillment_id),
            });
        }
        expected_prev = record.entry_hash.clone();
    }

    Ok(ChainReport {
        entries: records.len(),
        head_hash: records.last().map(|r| r.entry_hash.clone()),
        first_broken: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_chain(quantities: &[u32]) -> Vec<FulfillmentRecord> {
        let mut records: Vec<FulfillmentRecord> = Vec::new();
        for (i, quantity) in quantities.iter().enumerate() {
            let entry = NewFulfillment {
                request_id: format!("req-{i}"),
                batch_id: "B1".into(),
                medicine_id: "med-1".into(),
                quantity: *quantity,
                created_at: "2025-03-01T08:00:00+00:00".into(),
            };
            let prev_hash = records
                .last()
                .map(|r| r.entry_hash.clone())
                .unwrap_or_default();
            let entry_hash = chain_hash(&prev_hash, &entry).unwrap();
            records.push(FulfillmentRecord {
                fulfillment_id: i as i64 + 1,
                request_id: entry.request_id,
                batch_id: entry.batch_id,
                medicine_id: entry.medicine_id,
                quantity: entry.quantity,
                created_at: entry.created_at,
                prev_hash,
                entry_hash,
            });
        }
        records
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let chain = build_chain(&[1]);
        assert_eq!(chain[0].entry_hash.len(), 64);
        assert!(chain[0].entry_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_prev_hash_changes_entry_hash() {
        let entry = build_chain(&[1])[0].payload();
        assert_ne!(
            chain_hash("", &entry).unwrap(),
            chain_hash("abc", &entry).unwrap()
        );
    }

    #[test]
    fn test_empty_chain_is_intact() {
        let report = verify_chain(&[]).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.entries, 0);
        assert!(report.head_hash.is_none());
    }

    #[test]
    fn test_intact_chain() {
        let chain = build_chain(&[3, 4, 5]);
        let report = verify_chain(&chain).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.entries, 3);
        assert_eq!(report.head_hash, Some(chain[2].entry_hash.clone()));
    }

    #[test]
    fn test_tampered_quantity_detected() {
        let mut chain = build_chain(&[3, 4, 5]);
        chain[1].quantity = 40;
        let report = verify_chain(&chain).unwrap();
        assert_eq!(report.first_broken, Some(2));
    }

    #[test]
    fn test_removed_record_detected() {
        let mut chain = build_chain(&[3, 4, 5]);
        chain.remove(1);
        let report = verify_chain(&chain).unwrap();
        assert_eq!(report.first_broken, Some(3));
    }
}
