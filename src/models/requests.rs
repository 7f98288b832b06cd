//! Request DTOs for the message interface
//!
//! Defines the structure of incoming message bodies.

use serde::Deserialize;

use super::base64_bytes;
use crate::cache::MAX_KEY_LENGTH;

/// Message sent to the cache service (POST /message)
///
/// Tagged by `action`, e.g. `{"action": "getCachedResource", "url": "..."}`.
/// Byte payloads travel as standard base64.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    /// Copy a possibly large buffer, chunked when over the threshold
    ProcessEpub {
        #[serde(deserialize_with = "base64_bytes::deserialize")]
        data: Vec<u8>,
    },
    /// Store a resource and record it in the usage ledger
    CacheResource {
        url: String,
        #[serde(deserialize_with = "base64_bytes::deserialize")]
        data: Vec<u8>,
    },
    /// Fetch a cached resource and refresh its access time
    GetCachedResource { url: String },
    /// Delete a cached resource and its ledger record
    RemoveResource { url: String },
}

impl Message {
    /// Validates the message
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let url = match self {
            Message::ProcessEpub { .. } => return None,
            Message::CacheResource { url, .. }
            | Message::GetCachedResource { url }
            | Message::RemoveResource { url } => url,
        };
        if url.is_empty() {
            return Some("Resource url cannot be empty".to_string());
        }
        if url.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Resource url exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}

/// Query parameters for POST /evict
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvictQuery {
    /// Only report what would be evicted
    #[serde(default)]
    pub dry_run: bool,
}
