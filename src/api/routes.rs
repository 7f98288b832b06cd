//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    evict_handler, health_handler, message_handler, reconcile_handler, usage_handler, AppState,
};

/// Largest accepted request body; base64 inflates a whole book by a third.
pub const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /message` - Dispatch a message (processEpub, cacheResource, getCachedResource, removeResource)
/// - `GET /usage` - Ledger contents and statistics
/// - `POST /evict` - Run an eviction sweep (`?dry_run=true` to only plan)
/// - `POST /reconcile` - Remove orphans between ledger and blob cache
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin, the extension pages call from their own origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/message", post(message_handler))
        .route("/usage", get(usage_handler))
        .route("/evict", post(evict_handler))
        .route("/reconcile", post(reconcile_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
