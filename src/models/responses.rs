//! Response DTOs for the message interface
//!
//! Defines the structure of outgoing response bodies.

use std::collections::BTreeMap;

use base64::Engine;
use serde::Serialize;

use crate::cache::{
    EvictionCandidate, EvictionPolicy, EvictionReport, LedgerSnapshot, UsageRecord, UsageStats,
};

/// Reply to a message (POST /message), and the body of every error
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Whether the request succeeded
    pub success: bool,
    /// Base64 payload for requests that return bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Error message describing what went wrong
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    /// Success without a payload
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    /// Success carrying `bytes`
    pub fn with_data(bytes: &[u8]) -> Self {
        Self {
            success: true,
            data: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            error: None,
        }
    }

    /// Failure with an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Response body for the usage endpoint (GET /usage)
#[derive(Debug, Clone, Serialize)]
pub struct UsageResponse {
    pub total_bytes: u64,
    pub budget_bytes: u64,
    pub low_water_bytes: u64,
    pub resource_count: usize,
    pub resources: BTreeMap<String, UsageRecord>,
    pub stats: UsageStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl UsageResponse {
    pub fn new(snapshot: LedgerSnapshot, policy: EvictionPolicy, stats: UsageStats) -> Self {
        Self {
            total_bytes: snapshot.total_bytes(),
            budget_bytes: policy.budget_bytes,
            low_water_bytes: policy.low_water_bytes,
            resource_count: snapshot.len(),
            resources: snapshot.records().clone(),
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the evict endpoint (POST /evict)
#[derive(Debug, Clone, Serialize)]
pub struct EvictResponse {
    pub dry_run: bool,
    /// Planned evictions, for dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned: Option<Vec<EvictionCandidate>>,
    /// Sweep outcome, for real runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<EvictionReport>,
}

impl EvictResponse {
    pub fn planned(planned: Vec<EvictionCandidate>) -> Self {
        Self {
            dry_run: true,
            planned: Some(planned),
            report: None,
        }
    }

    pub fn swept(report: EvictionReport) -> Self {
        Self {
            dry_run: false,
            planned: None,
            report: Some(report),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
