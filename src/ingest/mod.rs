//! Ingest Module
//!
//! Helpers for processing large incoming buffers without blocking the
//! request loop.

mod chunked;

pub use chunked::chunked_copy;
#[cfg(test)]
pub(crate) use chunked::chunk_ranges;
