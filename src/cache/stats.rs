//! Cache Statistics Module
//!
//! Tracks resource cache activity: hits, misses, writes and evictions.

use serde::Serialize;

// == Usage Stats ==
/// Counters for resource cache activity since startup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageStats {
    /// Number of successful resource retrievals
    pub hits: u64,
    /// Number of retrievals of resources that were not cached
    pub misses: u64,
    /// Number of resources written to the cache
    pub writes: u64,
    /// Number of resources evicted by sweeps
    pub evictions: u64,
    /// Number of candidates a sweep failed to evict
    pub eviction_failures: u64,
    /// Number of sweeps that ran
    pub sweeps: u64,
}

impl UsageStats {
    // == Constructor ==
    /// Creates a new UsageStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    // == Record Sweep ==
    /// Adds the outcome of one eviction sweep.
    pub fn record_sweep(&mut self, evicted: usize, failures: usize) {
        self.sweeps += 1;
        self.evictions += evicted as u64;
        self.eviction_failures += failures as u64;
    }
}
