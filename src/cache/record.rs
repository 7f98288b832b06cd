//! Usage Record Module
//!
//! Defines the per-resource usage record and the clocks used to stamp it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// == Usage Record ==
/// Size and last access time of one cached resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Byte length of the cached content
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Last read or write (Unix milliseconds)
    #[serde(rename = "lastAccessed")]
    pub last_accessed_at: u64,
}

impl UsageRecord {
    // == Constructor ==
    /// Creates a record for content of `size_bytes` accessed at `now`.
    pub fn new(size_bytes: u64, now: u64) -> Self {
        Self {
            size_bytes,
            last_accessed_at: now,
        }
    }

    // == Touch ==
    /// Refreshes the access time.
    ///
    /// The access time never moves backwards, so a clock step back leaves the
    /// previous value in place.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed_at = self.last_accessed_at.max(now);
    }
}

// == Clocks ==
/// Source of access timestamps in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        current_timestamp_ms()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
///
/// A clock set before the epoch reads as 0.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = UsageRecord::new(1024, 42);

        assert_eq!(record.size_bytes, 1024);
        assert_eq!(record.last_accessed_at, 42);
    }

    #[test]
    fn test_touch_moves_forward() {
        let mut record = UsageRecord::new(10, 100);
        record.touch(250);
        assert_eq!(record.last_accessed_at, 250);
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut record = UsageRecord::new(10, 500);
        record.touch(100);
        assert_eq!(record.last_accessed_at, 500);
    }

    #[test]
    fn test_record_serialized_field_names() {
        let record = UsageRecord::new(7, 9);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"size":7,"lastAccessed":9}"#);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1);
        assert_eq!(clock.now_ms(), 1);

        clock.advance(4);
        assert_eq!(clock.now_ms(), 5);

        clock.set(100);
        assert_eq!(clock.now_ms(), 100);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01 in Unix milliseconds
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
