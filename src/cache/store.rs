//! Resource Cache Module
//!
//! Pairs the blob cache with the usage ledger and the eviction engine. This
//! is what the message handlers talk to.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{
    Clock, EvictionCandidate, EvictionEngine, EvictionPolicy, EvictionReport, LedgerSnapshot,
    SystemClock, UsageAccounting, UsageStats, MAX_KEY_LENGTH,
};
use crate::config::{Config, EvictionTrigger};
use crate::error::{CacheError, Result};
use crate::ingest::chunked_copy;
use crate::storage::{BlobCache, KeyValueStore};

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Ledger records dropped because their content was gone
    pub removed_records: Vec<String>,
    /// Blobs deleted because the ledger did not track them
    pub removed_blobs: Vec<String>,
}

// == Resource Cache ==
/// Blob cache plus usage accounting under a byte budget.
pub struct ResourceCache {
    blobs: Arc<dyn BlobCache>,
    accounting: UsageAccounting,
    eviction: EvictionEngine,
    trigger: EvictionTrigger,
    chunk_size: usize,
    chunk_threshold: usize,
    stats: Mutex<UsageStats>,
}

impl ResourceCache {
    // == Constructor ==
    /// Creates a resource cache from configuration and the two backing stores.
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>, blobs: Arc<dyn BlobCache>) -> Self {
        Self::with_clock(config, store, blobs, Arc::new(SystemClock))
    }

    /// Creates a resource cache with an explicit access clock.
    pub fn with_clock(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        blobs: Arc<dyn BlobCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            blobs,
            accounting: UsageAccounting::with_clock(store, clock),
            eviction: EvictionEngine::new(EvictionPolicy::new(
                config.budget_bytes,
                config.low_water_ratio,
            )),
            trigger: config.eviction_trigger,
            chunk_size: config.chunk_size,
            chunk_threshold: config.chunk_threshold,
            stats: Mutex::new(UsageStats::new()),
        }
    }

    // == Process Buffer ==
    /// Returns a copy of `data`, chunked when it exceeds the threshold.
    pub async fn process_buffer(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        if data.len() > self.chunk_threshold {
            info!("Large buffer ({} bytes), processing in chunks", data.len());
        }
        chunked_copy(data, self.chunk_size, self.chunk_threshold).await
    }

    // == Cache Resource ==
    /// Stores `data` under `key` and records the write in the ledger.
    ///
    /// With the after-write trigger, a write that leaves usage over budget
    /// runs a sweep before returning, waiting out any sweep already running.
    pub async fn cache_resource(&self, key: &str, data: Vec<u8>) -> Result<()> {
        validate_key(key)?;
        let size = data.len() as u64;

        self.blobs.put(key, data).await?;
        self.accounting.record_write(key, size).await?;
        self.stats.lock().await.record_write();
        debug!("Cached '{}' ({} bytes)", key, size);

        if self.trigger == EvictionTrigger::AfterWrite {
            let total = self.accounting.total_bytes().await?;
            if self.eviction.policy().is_over_budget(total) {
                let report = self
                    .eviction
                    .sweep_after(&self.accounting, self.blobs.as_ref())
                    .await?;
                self.record_sweep(&report).await;
            }
        }
        Ok(())
    }

    // == Get Cached Resource ==
    /// Returns the content under `key` and refreshes its access time.
    pub async fn get_cached_resource(&self, key: &str) -> Result<Vec<u8>> {
        match self.blobs.match_key(key).await? {
            Some(bytes) => {
                self.accounting.record_read(key).await?;
                self.stats.lock().await.record_hit();
                Ok(bytes)
            }
            None => {
                self.stats.lock().await.record_miss();
                Err(CacheError::NotCached(key.to_string()))
            }
        }
    }

    // == Remove Resource ==
    /// Deletes the content under `key` and its ledger record.
    ///
    /// Returns whether either store held the key.
    pub async fn remove_resource(&self, key: &str) -> Result<bool> {
        let had_blob = self.blobs.delete(key).await?;
        let had_record = self.accounting.remove(key).await?.is_some();
        Ok(had_blob || had_record)
    }

    // == Sweep ==
    /// Runs one eviction sweep.
    pub async fn sweep(&self) -> Result<EvictionReport> {
        let report = self
            .eviction
            .sweep(&self.accounting, self.blobs.as_ref())
            .await?;
        self.record_sweep(&report).await;
        Ok(report)
    }

    async fn record_sweep(&self, report: &EvictionReport) {
        if !report.skipped {
            self.stats
                .lock()
                .await
                .record_sweep(report.evicted.len(), report.failures.len());
        }
    }

    // == Plan Sweep ==
    /// Lists what a sweep would evict right now, without evicting.
    pub async fn plan_sweep(&self) -> Result<Vec<EvictionCandidate>> {
        let snapshot = self.accounting.snapshot().await?;
        Ok(self.eviction.policy().plan(&snapshot))
    }

    // == Reconcile ==
    /// Brings the ledger and the blob cache back in line with each other.
    ///
    /// Records without content are dropped from the ledger and blobs
    /// without a record are deleted.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let snapshot = self.accounting.snapshot().await?;
        let blob_keys: HashSet<String> = self.blobs.keys().await?.into_iter().collect();
        let mut report = ReconcileReport::default();

        for key in snapshot.keys() {
            if !blob_keys.contains(key) {
                self.accounting.remove(key).await?;
                report.removed_records.push(key.to_string());
            }
        }

        let mut orphans: Vec<&String> = blob_keys
            .iter()
            .filter(|key| !snapshot.contains(key))
            .collect();
        orphans.sort();
        for key in orphans {
            // Written after the snapshot was taken
            if self.accounting.snapshot().await?.contains(key) {
                continue;
            }
            self.blobs.delete(key).await?;
            report.removed_blobs.push(key.clone());
        }

        if report.removed_records.is_empty() && report.removed_blobs.is_empty() {
            debug!("Reconcile found ledger and blob cache consistent");
        } else {
            warn!(
                "Reconcile removed {} orphan records and {} orphan blobs",
                report.removed_records.len(),
                report.removed_blobs.len()
            );
        }
        Ok(report)
    }

    // == Usage ==
    /// Current ledger contents.
    pub async fn snapshot(&self) -> Result<LedgerSnapshot> {
        self.accounting.snapshot().await
    }

    /// Activity counters since startup.
    pub async fn stats(&self) -> UsageStats {
        self.stats.lock().await.clone()
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.eviction.policy()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest(
            "Resource key cannot be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Resource key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
