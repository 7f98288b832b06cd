//! Storage Module
//!
//! Durable key-value store and blob cache the usage ledger and resource
//! cache are built on.
//!
//! # Backends
//! - Memory: process-local maps, used by tests and ephemeral runs
//! - Filesystem: JSON values and blob files under a data directory

mod fs;
mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use fs::{DirBlobCache, JsonFileStore};
pub use memory::{MemoryBlobCache, MemoryKvStore};

/// Version tag of the blob namespace; bump to abandon old blobs.
pub const CACHE_VERSION: u32 = 1;

/// Name of the blob namespace directory.
pub fn cache_name() -> String {
    format!("reader-cache-v{}", CACHE_VERSION)
}

// == Key-Value Store ==
/// Durable store of opaque values under string keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

// == Blob Cache ==
/// Store of raw resource bytes keyed by resource identifier.
///
/// Each call is atomic per key; nothing is transactional across keys or
/// with the usage ledger.
#[async_trait]
pub trait BlobCache: Send + Sync {
    /// Stores `bytes` under `key`, replacing previous content.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Returns the content stored under `key`.
    async fn match_key(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Deletes the content under `key`. Returns whether anything was deleted.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Lists every stored key.
    async fn keys(&self) -> Result<Vec<String>>;
}
