//! Reader Cache - resource cache for an EPUB reader's background helper
//!
//! Stores fetched resources as blobs, tracks their size and last access in a
//! durable usage ledger, and evicts least recently used resources to keep
//! the cache within a byte budget.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::ResourceCache;
pub use config::{Config, EvictionTrigger};
pub use tasks::spawn_eviction_task;
