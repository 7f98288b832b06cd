//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check ledger accounting, eviction and chunked copy
//! properties over arbitrary inputs.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use tokio_test::block_on;

use crate::cache::{EvictionEngine, EvictionPolicy, ManualClock, UsageAccounting, UsageLedger};
use crate::ingest::{chunk_ranges, chunked_copy};
use crate::storage::{BlobCache, MemoryBlobCache, MemoryKvStore};

// == Strategies ==
/// Small key space so sequences revisit keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}"
}

#[derive(Debug, Clone)]
enum LedgerOp {
    Write { key: String, size: u64 },
    Read { key: String },
    Remove { key: String },
}

fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (key_strategy(), 0u64..10_000).prop_map(|(key, size)| LedgerOp::Write { key, size }),
        key_strategy().prop_map(|key| LedgerOp::Read { key }),
        key_strategy().prop_map(|key| LedgerOp::Remove { key }),
    ]
}

/// Distinct keys, each with a size and an access time
fn records_strategy() -> impl Strategy<Value = BTreeMap<String, (u64, u64)>> {
    prop::collection::btree_map("[a-z]{1,6}", (1u64..500, 0u64..1_000), 1..30)
}

fn seeded_accounting(
    records: &BTreeMap<String, (u64, u64)>,
    blobs: &MemoryBlobCache,
) -> UsageAccounting {
    let clock = Arc::new(ManualClock::new(0));
    let accounting = UsageAccounting::with_clock(Arc::new(MemoryKvStore::new()), clock.clone());
    block_on(async {
        for (key, (size, at)) in records {
            clock.set(*at);
            blobs.put(key, vec![0; *size as usize]).await.unwrap();
            accounting.record_write(key, *size).await.unwrap();
        }
    });
    accounting
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // *For any* sequence of writes, reads and removals, the ledger total
    // equals the exact sum of the current record sizes.
    #[test]
    fn prop_total_equals_sum_of_records(ops in prop::collection::vec(ledger_op_strategy(), 1..60)) {
        let accounting = UsageAccounting::new(Arc::new(MemoryKvStore::new()));

        block_on(async {
            for op in ops {
                match op {
                    LedgerOp::Write { key, size } => accounting.record_write(&key, size).await.unwrap(),
                    LedgerOp::Read { key } => { accounting.record_read(&key).await.unwrap(); }
                    LedgerOp::Remove { key } => { accounting.remove(&key).await.unwrap(); }
                }

                let snapshot = accounting.snapshot().await.unwrap();
                let sum: u64 = snapshot.records().values().map(|r| r.size_bytes).sum();
                assert_eq!(snapshot.total_bytes(), sum);
            }
        });
    }

    // *For any* ledger, reading a key it does not track leaves it unchanged.
    #[test]
    fn prop_read_never_creates_records(
        writes in prop::collection::vec((key_strategy(), 0u64..100), 0..20),
        absent in "[g-z]{1,4}"
    ) {
        let mut ledger = UsageLedger::new();
        for (key, size) in &writes {
            ledger.upsert(key, *size, 1);
        }
        let before = ledger.clone();

        prop_assert!(!ledger.touch(&absent, 2));
        prop_assert_eq!(ledger, before);
    }

    // *For any* ledger over budget, a sweep without deletion failures ends at
    // or below the low-water mark, and stops as soon as it gets there.
    #[test]
    fn prop_sweep_reaches_low_water_and_stops(
        records in records_strategy(),
        budget in 1u64..5_000
    ) {
        let blobs = MemoryBlobCache::new();
        let accounting = seeded_accounting(&records, &blobs);
        let engine = EvictionEngine::new(EvictionPolicy::new(budget, 0.8));
        let policy = engine.policy();

        let report = block_on(engine.sweep(&accounting, &blobs)).unwrap();
        let after = block_on(accounting.snapshot()).unwrap();

        prop_assert!(report.failures.is_empty());
        prop_assert_eq!(after.total_bytes(), report.bytes_after);
        prop_assert!(after.total_bytes() <= policy.budget_bytes || report.evicted.is_empty());

        if policy.is_over_budget(report.bytes_before) {
            prop_assert!(after.total_bytes() <= policy.low_water_bytes);
            // Usage was still above the mark right before the last eviction
            let last = report.evicted.last().unwrap();
            let last_size = records[last].0;
            prop_assert!(after.total_bytes() + last_size > policy.low_water_bytes);
        } else {
            prop_assert!(report.evicted.is_empty());
        }

        // Blob cache and ledger still hold the same keys
        let blob_keys = block_on(blobs.keys()).unwrap();
        let ledger_keys: Vec<String> = after.keys().map(str::to_string).collect();
        prop_assert_eq!(blob_keys, ledger_keys);
    }

    // *For any* sweep, no surviving record was accessed before an evicted one.
    #[test]
    fn prop_sweep_evicts_least_recently_accessed_first(
        records in records_strategy(),
        budget in 1u64..5_000
    ) {
        let blobs = MemoryBlobCache::new();
        let accounting = seeded_accounting(&records, &blobs);
        let engine = EvictionEngine::new(EvictionPolicy::new(budget, 0.8));

        let report = block_on(engine.sweep(&accounting, &blobs)).unwrap();
        let after = block_on(accounting.snapshot()).unwrap();

        let newest_evicted = report.evicted.iter().map(|k| records[k].1).max();
        let oldest_kept = after.records().values().map(|r| r.last_accessed_at).min();

        if let (Some(evicted), Some(kept)) = (newest_evicted, oldest_kept) {
            prop_assert!(evicted <= kept);
        }
    }

    // *For any* buffer, chunk size and threshold, the chunked copy is
    // byte-identical to the input.
    #[test]
    fn prop_chunked_copy_identity(
        data in prop::collection::vec(any::<u8>(), 0..4_096),
        chunk_size in 1usize..512,
        threshold in 0usize..4_096
    ) {
        let output = block_on(chunked_copy(data.clone(), chunk_size, threshold)).unwrap();
        prop_assert_eq!(output, data);
    }

    // *For any* length and chunk size, the pieces tile the buffer exactly.
    #[test]
    fn prop_chunk_ranges_tile_buffer(len in 0usize..10_000, chunk_size in 1usize..1_000) {
        let ranges = chunk_ranges(len, chunk_size);

        let mut expected_start = 0;
        for range in &ranges {
            prop_assert_eq!(range.start, expected_start);
            prop_assert!(range.end - range.start <= chunk_size);
            prop_assert!(range.end > range.start);
            expected_start = range.end;
        }
        prop_assert_eq!(expected_start, len);
    }
}
