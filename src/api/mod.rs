//! API Module
//!
//! HTTP handlers and routing for the resource cache's message interface.
//!
//! # Endpoints
//! - `POST /message` - Dispatch a message to the cache
//! - `GET /usage` - Ledger contents and statistics
//! - `POST /evict` - Run or plan an eviction sweep
//! - `POST /reconcile` - Remove ledger/blob orphans
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
