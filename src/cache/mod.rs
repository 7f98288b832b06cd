//! Cache Module
//!
//! Usage ledger, accounting, eviction and the resource cache built on them.

mod accounting;
mod eviction;
mod ledger;
mod record;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use accounting::{UsageAccounting, LEDGER_STORE_KEY};
pub use eviction::{
    EvictionCandidate, EvictionEngine, EvictionFailure, EvictionPolicy, EvictionReport,
};
pub use ledger::{LedgerSnapshot, UsageLedger};
pub use record::{current_timestamp_ms, Clock, ManualClock, SystemClock, UsageRecord};
pub use stats::UsageStats;
pub use store::{ReconcileReport, ResourceCache};

// == Public Constants ==
/// Maximum allowed resource key length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;

/// Default cache budget in bytes
pub const DEFAULT_BUDGET_BYTES: u64 = 50 * 1024 * 1024; // 50 MB

/// Default low-water mark as a fraction of the budget
pub const DEFAULT_LOW_WATER_RATIO: f64 = 0.8;

/// Default chunk size for large buffer copies
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024; // 1 MB

/// Buffers over this many chunks are copied in chunks
pub const DEFAULT_THRESHOLD_CHUNKS: usize = 5;
