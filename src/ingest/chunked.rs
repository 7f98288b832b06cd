//! Chunked Copy
//!
//! Copies large buffers piece by piece on worker threads so the async
//! runtime stays responsive while an imported book is processed.

use std::ops::Range;
use std::thread;

use tracing::debug;

use crate::error::{CacheError, Result};

/// Byte ranges of the pieces a buffer of `len` bytes is split into.
///
/// Every piece is `chunk_size` bytes except possibly the last.
pub(crate) fn chunk_ranges(len: usize, chunk_size: usize) -> Vec<Range<usize>> {
    if chunk_size == 0 {
        return Vec::new();
    }
    (0..len)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(len))
        .collect()
}

/// Returns a byte-identical copy of `buffer`.
///
/// Buffers of at most `threshold` bytes are returned as is. Larger buffers
/// are copied in `chunk_size` pieces into disjoint ranges of the destination
/// by a bounded set of worker threads; the call resolves once every piece
/// has landed.
pub async fn chunked_copy(buffer: Vec<u8>, chunk_size: usize, threshold: usize) -> Result<Vec<u8>> {
    if chunk_size == 0 {
        return Err(CacheError::InvalidRequest(
            "Chunk size must be greater than zero".to_string(),
        ));
    }

    if buffer.len() <= threshold {
        return Ok(buffer);
    }

    let pieces = buffer.len().div_ceil(chunk_size);
    debug!(
        "Copying {} bytes in {} chunks of {} bytes",
        buffer.len(),
        pieces,
        chunk_size
    );

    tokio::task::spawn_blocking(move || copy_in_chunks(&buffer, chunk_size))
        .await
        .map_err(|e| CacheError::Internal(format!("Chunked copy worker failed: {}", e)))
}

fn copy_in_chunks(source: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut destination = vec![0u8; source.len()];

    let pieces = source.len().div_ceil(chunk_size);
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(pieces)
        .max(1);
    // Each worker owns a run of whole chunks
    let stripe = pieces.div_ceil(workers) * chunk_size;

    thread::scope(|scope| {
        for (dst, src) in destination.chunks_mut(stripe).zip(source.chunks(stripe)) {
            scope.spawn(move || {
                for range in chunk_ranges(src.len(), chunk_size) {
                    dst[range.clone()].copy_from_slice(&src[range]);
                }
            });
        }
    });

    destination
}
