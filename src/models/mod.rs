//! Request and Response models for the message interface
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing message bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{EvictQuery, Message};
pub use responses::{EvictResponse, HealthResponse, MessageResponse, UsageResponse};

/// Reads a standard base64 string into bytes.
pub(crate) mod base64_bytes {
    use base64::Engine;
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(D::Error::custom)
    }
}
