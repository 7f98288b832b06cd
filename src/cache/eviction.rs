//! Eviction Policy Module
//!
//! Keeps total cache usage within a byte budget by evicting the least
//! recently accessed resources down to a low-water mark.

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::{LedgerSnapshot, UsageAccounting};
use crate::error::Result;
use crate::storage::BlobCache;

// == Eviction Policy ==
/// Budget and low-water mark of an eviction sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Hard budget `B` in bytes
    pub budget_bytes: u64,
    /// Usage a sweep reduces to, at most `budget_bytes`
    pub low_water_bytes: u64,
}

/// Resource chosen for eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvictionCandidate {
    pub key: String,
    pub size_bytes: u64,
}

impl EvictionPolicy {
    /// Creates a policy whose low-water mark is `low_water_ratio` of the budget.
    pub fn new(budget_bytes: u64, low_water_ratio: f64) -> Self {
        let ratio = low_water_ratio.clamp(0.0, 1.0);
        Self {
            budget_bytes,
            low_water_bytes: (budget_bytes as f64 * ratio).floor() as u64,
        }
    }

    /// Whether `total_bytes` exceeds the budget.
    pub fn is_over_budget(&self, total_bytes: u64) -> bool {
        total_bytes > self.budget_bytes
    }

    // == Plan ==
    /// Returns the resources a sweep would evict if every deletion succeeded.
    ///
    /// Empty when usage is within budget. Otherwise the oldest-accessed
    /// records are taken until the remaining total is at or below the
    /// low-water mark.
    pub fn plan(&self, snapshot: &LedgerSnapshot) -> Vec<EvictionCandidate> {
        let mut running = snapshot.total_bytes();
        if !self.is_over_budget(running) {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for (key, record) in snapshot.eviction_order() {
            if running <= self.low_water_bytes {
                break;
            }
            running = running.saturating_sub(record.size_bytes);
            candidates.push(EvictionCandidate {
                key: key.to_string(),
                size_bytes: record.size_bytes,
            });
        }
        candidates
    }
}

// == Eviction Report ==
/// Candidate a sweep failed to evict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvictionFailure {
    pub key: String,
    pub error: String,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    /// Ledger total when the sweep started
    pub bytes_before: u64,
    /// Running total when the sweep finished
    pub bytes_after: u64,
    /// Keys removed from both the blob cache and the ledger
    pub evicted: Vec<String>,
    /// Candidates that could not be evicted
    pub failures: Vec<EvictionFailure>,
    /// True when another sweep was already running
    pub skipped: bool,
}

// == Eviction Engine ==
/// Executes eviction sweeps against the blob cache and the usage ledger.
///
/// At most one sweep runs at a time. Sweeps do not block writes.
#[derive(Debug)]
pub struct EvictionEngine {
    policy: EvictionPolicy,
    sweeping: Mutex<()>,
}

impl EvictionEngine {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            sweeping: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    // == Sweep ==
    /// Evicts least recently accessed resources until usage is at or below
    /// the low-water mark.
    ///
    /// Returns a skipped report when another sweep is already running.
    pub async fn sweep(
        &self,
        accounting: &UsageAccounting,
        blobs: &dyn BlobCache,
    ) -> Result<EvictionReport> {
        let _sweeping = match self.sweeping.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Eviction sweep already running, skipping");
                return Ok(EvictionReport {
                    skipped: true,
                    ..EvictionReport::default()
                });
            }
        };
        self.run(accounting, blobs).await
    }

    /// Like [`sweep`](Self::sweep), but waits for a running sweep to finish
    /// and then checks the budget again against the current ledger.
    pub async fn sweep_after(
        &self,
        accounting: &UsageAccounting,
        blobs: &dyn BlobCache,
    ) -> Result<EvictionReport> {
        let _sweeping = self.sweeping.lock().await;
        self.run(accounting, blobs).await
    }

    /// A candidate whose content cannot be deleted keeps its ledger record
    /// and its bytes stay in the running total; the sweep moves on to the
    /// next candidate. A ledger removal failure ends the sweep with that
    /// error, since the content is already gone.
    async fn run(
        &self,
        accounting: &UsageAccounting,
        blobs: &dyn BlobCache,
    ) -> Result<EvictionReport> {
        let snapshot = accounting.snapshot().await?;
        let mut report = EvictionReport {
            bytes_before: snapshot.total_bytes(),
            bytes_after: snapshot.total_bytes(),
            ..EvictionReport::default()
        };

        if !self.policy.is_over_budget(snapshot.total_bytes()) {
            debug!(
                "Cache usage {} bytes within budget {} bytes",
                snapshot.total_bytes(),
                self.policy.budget_bytes
            );
            return Ok(report);
        }

        info!(
            "Cache usage {} bytes over budget {} bytes, evicting down to {} bytes",
            snapshot.total_bytes(),
            self.policy.budget_bytes,
            self.policy.low_water_bytes
        );

        let mut running = snapshot.total_bytes();
        for (key, record) in snapshot.eviction_order() {
            if running <= self.policy.low_water_bytes {
                break;
            }

            match blobs.delete(key).await {
                Ok(true) => {}
                Ok(false) => debug!("'{}' had no content left, dropping its record", key),
                Err(e) => {
                    warn!("Failed to evict '{}' from blob cache: {}", key, e);
                    report.failures.push(EvictionFailure {
                        key: key.to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            }

            if let Err(e) = accounting.remove(key).await {
                error!(
                    "Evicted '{}' content but ledger removal failed, stopping sweep after {} evictions: {}",
                    key,
                    report.evicted.len(),
                    e
                );
                return Err(e);
            }
            running = running.saturating_sub(record.size_bytes);
            report.evicted.push(key.to_string());
        }

        report.bytes_after = running;
        info!(
            "Eviction sweep finished: {} evicted, {} failed, {} -> {} bytes",
            report.evicted.len(),
            report.failures.len(),
            report.bytes_before,
            report.bytes_after
        );
        Ok(report)
    }
}
