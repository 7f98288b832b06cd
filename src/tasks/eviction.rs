//! Eviction Sweep Task
//!
//! Background task that periodically sweeps the resource cache back under
//! its byte budget.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::ResourceCache;

/// Spawns a background task that runs an eviction sweep every interval.
///
/// The task runs until aborted; a failed sweep is logged and retried on the
/// next tick.
///
/// # Example
/// ```ignore
/// let sweep_handle = spawn_eviction_task(cache.clone(), 60);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_eviction_task(cache: Arc<ResourceCache>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting eviction task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.sweep().await {
                Ok(report) if !report.evicted.is_empty() => {
                    info!(
                        "Eviction task: evicted {} resources ({} -> {} bytes)",
                        report.evicted.len(),
                        report.bytes_before,
                        report.bytes_after
                    );
                }
                Ok(_) => debug!("Eviction task: cache within budget"),
                Err(e) => error!("Eviction task: sweep failed: {}", e),
            }
        }
    })
}
