//! API Handlers
//!
//! HTTP request handlers for the message interface and maintenance endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::cache::ResourceCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    EvictQuery, EvictResponse, HealthResponse, Message, MessageResponse, UsageResponse,
};
use crate::storage::{BlobCache, KeyValueStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared resource cache
    pub cache: Arc<ResourceCache>,
}

impl AppState {
    /// Creates a new AppState around the given resource cache.
    pub fn new(cache: ResourceCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration and backing stores.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        blobs: Arc<dyn BlobCache>,
    ) -> Self {
        Self::new(ResourceCache::new(config, store, blobs))
    }
}

/// Handler for POST /message
///
/// Dispatches one message to the resource cache. Failures come back as
/// `{"success": false, "error": ...}` with a matching status code.
pub async fn message_handler(
    State(state): State<AppState>,
    Json(message): Json<Message>,
) -> Result<Json<MessageResponse>> {
    if let Some(error_msg) = message.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let response = match message {
        Message::ProcessEpub { data } => {
            let processed = state.cache.process_buffer(data).await?;
            MessageResponse::with_data(&processed)
        }
        Message::CacheResource { url, data } => {
            state.cache.cache_resource(&url, data).await?;
            MessageResponse::ok()
        }
        Message::GetCachedResource { url } => {
            let bytes = state.cache.get_cached_resource(&url).await?;
            MessageResponse::with_data(&bytes)
        }
        Message::RemoveResource { url } => {
            state.cache.remove_resource(&url).await?;
            MessageResponse::ok()
        }
    };

    Ok(Json(response))
}

/// Handler for GET /usage
///
/// Returns the ledger contents, budget and activity counters.
pub async fn usage_handler(State(state): State<AppState>) -> Result<Json<UsageResponse>> {
    let snapshot = state.cache.snapshot().await?;
    let stats = state.cache.stats().await;

    Ok(Json(UsageResponse::new(
        snapshot,
        state.cache.policy(),
        stats,
    )))
}

/// Handler for POST /evict
///
/// Runs an eviction sweep, or with `?dry_run=true` only reports the plan.
pub async fn evict_handler(
    State(state): State<AppState>,
    Query(query): Query<EvictQuery>,
) -> Result<Json<EvictResponse>> {
    if query.dry_run {
        let planned = state.cache.plan_sweep().await?;
        return Ok(Json(EvictResponse::planned(planned)));
    }

    let report = state.cache.sweep().await?;
    Ok(Json(EvictResponse::swept(report)))
}

/// Handler for POST /reconcile
///
/// Removes ledger records without content and content without records.
pub async fn reconcile_handler(
    State(state): State<AppState>,
) -> Result<Json<crate::cache::ReconcileReport>> {
    Ok(Json(state.cache.reconcile().await?))
}

/// Handler for GET /health
///
/// Returns health status of the service.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
