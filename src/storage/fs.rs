//! Filesystem storage backends.
//!
//! Values and blobs are written to a temporary file and renamed into place,
//! so a reader never sees a half-written file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use super::{cache_name, BlobCache, KeyValueStore};
use crate::error::{CacheError, Result};

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    // Unique per write
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", TMP_SEQ.fetch_add(1, Ordering::Relaxed)));
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

async fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

async fn remove_optional(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// == JSON File Store ==
/// Key-value store keeping one file per key in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|e| {
            CacheError::Persistence(format!("Cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(CacheError::InvalidRequest(format!(
                "Store key '{}' must be non-empty and use [A-Za-z0-9_-]",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        read_optional(&path)
            .await
            .map_err(|e| CacheError::Persistence(format!("Read {} failed: {}", path.display(), e)))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        write_atomic(&path, &value).await.map_err(|e| {
            CacheError::Persistence(format!("Write {} failed: {}", path.display(), e))
        })?;
        debug!("Stored {} bytes under '{}'", value.len(), key);
        Ok(())
    }
}

// == Directory Blob Cache ==
/// Blob cache storing each resource as a file named by the SHA-256 of its key.
///
/// A `.key` sidecar next to each `.bin` file holds the original key.
#[derive(Debug, Clone)]
pub struct DirBlobCache {
    dir: PathBuf,
}

impl DirBlobCache {
    /// Opens (creating if needed) the versioned blob namespace under `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let dir = root.as_ref().join(cache_name());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::Blob(format!("Cannot create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    /// Directory holding the blob files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stem(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", Self::stem(key)))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.key", Self::stem(key)))
    }
}

#[async_trait]
impl BlobCache for DirBlobCache {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        // Content first, so a listed key always has content behind it
        write_atomic(&self.blob_path(key), &bytes)
            .await
            .map_err(|e| CacheError::Blob(format!("Put '{}' failed: {}", key, e)))?;
        if let Err(e) = write_atomic(&self.key_path(key), key.as_bytes()).await {
            // Unlisted content would never be reconciled
            if let Err(cleanup) = remove_optional(&self.blob_path(key)).await {
                warn!("Could not remove unlisted blob for '{}': {}", key, cleanup);
            }
            return Err(CacheError::Blob(format!("Put '{}' failed: {}", key, e)));
        }
        Ok(())
    }

    async fn match_key(&self, key: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&self.blob_path(key))
            .await
            .map_err(|e| CacheError::Blob(format!("Match '{}' failed: {}", key, e)))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let deleted = remove_optional(&self.blob_path(key))
            .await
            .map_err(|e| CacheError::Blob(format!("Delete '{}' failed: {}", key, e)))?;
        remove_optional(&self.key_path(key))
            .await
            .map_err(|e| CacheError::Blob(format!("Delete '{}' failed: {}", key, e)))?;
        Ok(deleted)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let list_err = |e: std::io::Error| CacheError::Blob(format!("List failed: {}", e));

        let mut entries = fs::read_dir(&self.dir).await.map_err(list_err)?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("key") {
                continue;
            }
            if let Some(bytes) = read_optional(&path).await.map_err(list_err)? {
                keys.push(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
