//! In-memory storage backends.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BlobCache, KeyValueStore};
use crate::error::Result;

/// Key-value store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Blob cache held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobCache {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobCache for MemoryBlobCache {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.blobs.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn match_key(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.blobs.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
