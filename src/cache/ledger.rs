//! Usage Ledger Module
//!
//! In-memory ledger of resource key -> usage record, plus the running total.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::UsageRecord;
use crate::error::{CacheError, Result};

// == Usage Ledger ==
/// Aggregate usage of every cached resource.
///
/// `total_bytes` is recomputed from the records after every upsert and on
/// load, so it always equals the sum of all record sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLedger {
    /// Sum of all record sizes
    #[serde(rename = "totalSize")]
    total_bytes: u64,
    /// Records by resource key
    #[serde(rename = "resources")]
    records: BTreeMap<String, UsageRecord>,
}

/// Point-in-time copy of the ledger, used for eviction decisions and reporting.
pub type LedgerSnapshot = UsageLedger;

impl UsageLedger {
    // == Constructor ==
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    // == Decode ==
    /// Restores a ledger from its durable JSON form.
    ///
    /// A stored total that disagrees with the records is replaced by the
    /// recomputed sum.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let mut ledger: UsageLedger = serde_json::from_slice(bytes)
            .map_err(|e| CacheError::Persistence(format!("Corrupt usage ledger: {}", e)))?;

        let stored = ledger.total_bytes;
        ledger.recompute_total();
        if stored != ledger.total_bytes {
            warn!(
                "Usage ledger total drifted (stored {}, actual {}), corrected",
                stored, ledger.total_bytes
            );
        }
        Ok(ledger)
    }

    // == Encode ==
    /// Serializes the ledger into its durable JSON form.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| CacheError::Internal(format!("Failed to encode usage ledger: {}", e)))
    }

    // == Upsert ==
    /// Creates or replaces the record for `key`.
    ///
    /// The size is replaced, not added, and the access time refreshed.
    pub fn upsert(&mut self, key: &str, size_bytes: u64, now: u64) {
        match self.records.get_mut(key) {
            Some(record) => {
                record.size_bytes = size_bytes;
                record.touch(now);
            }
            None => {
                self.records
                    .insert(key.to_string(), UsageRecord::new(size_bytes, now));
            }
        }
        self.recompute_total();
    }

    // == Touch ==
    /// Refreshes the access time of `key`.
    ///
    /// Returns false, and changes nothing, when the key is not tracked.
    pub fn touch(&mut self, key: &str, now: u64) -> bool {
        match self.records.get_mut(key) {
            Some(record) => {
                record.touch(now);
                true
            }
            None => false,
        }
    }

    // == Remove ==
    /// Removes the record for `key`, returning it if it existed.
    pub fn remove(&mut self, key: &str) -> Option<UsageRecord> {
        let removed = self.records.remove(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(removed.size_bytes);
        Some(removed)
    }

    /// Restores a record that was removed, used to roll back a failed persist.
    pub(crate) fn restore(&mut self, key: &str, record: UsageRecord) {
        self.records.insert(key.to_string(), record);
        self.recompute_total();
    }

    // == Eviction Order ==
    /// Returns records oldest access first, ties broken by key.
    pub fn eviction_order(&self) -> Vec<(&str, &UsageRecord)> {
        let mut ordered: Vec<(&str, &UsageRecord)> = self
            .records
            .iter()
            .map(|(key, record)| (key.as_str(), record))
            .collect();
        // BTreeMap iteration is already key-ordered, a stable sort keeps that for ties
        ordered.sort_by_key(|(_, record)| record.last_accessed_at);
        ordered
    }

    // == Accessors ==
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn get(&self, key: &str) -> Option<&UsageRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn records(&self) -> &BTreeMap<String, UsageRecord> {
        &self.records
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn recompute_total(&mut self) {
        self.total_bytes = self.records.values().map(|r| r.size_bytes).sum();
    }
}
