//! Usage Accounting Module
//!
//! Records puts, reads and removals in the usage ledger and persists the
//! ledger after every mutation.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::cache::{Clock, LedgerSnapshot, SystemClock, UsageLedger, UsageRecord};
use crate::error::Result;
use crate::storage::KeyValueStore;

/// Key the ledger is persisted under in the durable store.
pub const LEDGER_STORE_KEY: &str = "cacheUsage";

// == Usage Accounting ==
/// Single owner of the usage ledger.
///
/// Every read-modify-write runs under one async mutex and persists before
/// the lock is released, so concurrent callers cannot lose each other's
/// updates and the durable copy always reflects mutation order.
pub struct UsageAccounting {
    /// Durable backing store
    store: Arc<dyn KeyValueStore>,
    /// Timestamp source
    clock: Arc<dyn Clock>,
    /// Lazily loaded ledger, None until first access
    ledger: Mutex<Option<UsageLedger>>,
}

impl UsageAccounting {
    // == Constructor ==
    /// Creates an accounting service over `store` using the wall clock.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates an accounting service with an explicit clock.
    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ledger: Mutex::new(None),
        }
    }

    // == Record Write ==
    /// Upserts the record for `key` with `size_bytes` and the current time.
    ///
    /// Persists the whole ledger before returning.
    pub async fn record_write(&self, key: &str, size_bytes: u64) -> Result<()> {
        let now = self.clock.now_ms();
        let mut guard = self.lock_loaded().await?;
        let ledger = loaded(&mut guard);

        let previous = ledger.get(key).copied();
        ledger.upsert(key, size_bytes, now);

        if let Err(e) = self.persist(ledger).await {
            match previous {
                Some(record) => ledger.restore(key, record),
                None => {
                    ledger.remove(key);
                }
            }
            return Err(e);
        }

        debug!(
            "Recorded write of '{}' ({} bytes), total now {} bytes",
            key,
            size_bytes,
            ledger.total_bytes()
        );
        Ok(())
    }

    // == Record Read ==
    /// Refreshes the access time of `key`.
    ///
    /// Untracked keys are ignored and nothing is persisted. Returns whether
    /// the key was tracked.
    pub async fn record_read(&self, key: &str) -> Result<bool> {
        let now = self.clock.now_ms();
        let mut guard = self.lock_loaded().await?;
        let ledger = loaded(&mut guard);

        let previous = match ledger.get(key).copied() {
            Some(record) => record,
            None => return Ok(false),
        };
        ledger.touch(key, now);

        if let Err(e) = self.persist(ledger).await {
            ledger.restore(key, previous);
            return Err(e);
        }
        Ok(true)
    }

    // == Remove ==
    /// Deletes the record for `key`, returning it if it was tracked.
    pub async fn remove(&self, key: &str) -> Result<Option<UsageRecord>> {
        let mut guard = self.lock_loaded().await?;
        let ledger = loaded(&mut guard);

        let removed = match ledger.remove(key) {
            Some(record) => record,
            None => return Ok(None),
        };

        if let Err(e) = self.persist(ledger).await {
            ledger.restore(key, removed);
            return Err(e);
        }

        debug!(
            "Removed '{}' ({} bytes), total now {} bytes",
            key,
            removed.size_bytes,
            ledger.total_bytes()
        );
        Ok(Some(removed))
    }

    // == Snapshot ==
    /// Returns a copy of the current ledger.
    pub async fn snapshot(&self) -> Result<LedgerSnapshot> {
        let mut guard = self.lock_loaded().await?;
        Ok(loaded(&mut guard).clone())
    }

    // == Total ==
    /// Current total of all record sizes.
    pub async fn total_bytes(&self) -> Result<u64> {
        let mut guard = self.lock_loaded().await?;
        Ok(loaded(&mut guard).total_bytes())
    }

    /// Locks the ledger, loading it from the durable store on first use.
    async fn lock_loaded(&self) -> Result<MutexGuard<'_, Option<UsageLedger>>> {
        let mut guard = self.ledger.lock().await;
        if guard.is_none() {
            let ledger = match self.store.get(LEDGER_STORE_KEY).await {
                Ok(Some(bytes)) => UsageLedger::from_json(&bytes)
                    .inspect_err(|e| error!("Failed to parse usage ledger: {}", e))?,
                Ok(None) => UsageLedger::new(),
                Err(e) => {
                    error!("Failed to load usage ledger: {}", e);
                    return Err(e);
                }
            };
            info!(
                "Usage ledger loaded: {} resources, {} bytes",
                ledger.len(),
                ledger.total_bytes()
            );
            *guard = Some(ledger);
        }
        Ok(guard)
    }

    async fn persist(&self, ledger: &UsageLedger) -> Result<()> {
        let bytes = ledger.to_json()?;
        self.store
            .set(LEDGER_STORE_KEY, bytes)
            .await
            .inspect_err(|e| error!("Failed to persist usage ledger: {}", e))
    }
}

fn loaded<'a>(guard: &'a mut MutexGuard<'_, Option<UsageLedger>>) -> &'a mut UsageLedger {
    guard.get_or_insert_with(UsageLedger::new)
}
