//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::{
    DEFAULT_BUDGET_BYTES, DEFAULT_CHUNK_SIZE, DEFAULT_LOW_WATER_RATIO, DEFAULT_THRESHOLD_CHUNKS,
};

/// When the eviction engine is asked to sweep, beyond any periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionTrigger {
    /// Sweep once when the service starts
    #[default]
    Startup,
    /// Sweep at startup and after every write that leaves the cache over budget
    AfterWrite,
}

impl FromStr for EvictionTrigger {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "startup" => Ok(EvictionTrigger::Startup),
            "after_write" | "after-write" => Ok(EvictionTrigger::AfterWrite),
            other => Err(format!("unknown eviction trigger '{}'", other)),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Byte budget `B` for all cached resources
    pub budget_bytes: u64,
    /// Fraction of the budget a sweep reduces usage to
    pub low_water_ratio: f64,
    /// Piece size used by the chunked ingest helper
    pub chunk_size: usize,
    /// Buffers larger than this are copied in chunks
    pub chunk_threshold: usize,
    /// Eviction trigger policy
    pub eviction_trigger: EvictionTrigger,
    /// Periodic sweep interval in seconds, 0 disables the task
    pub eviction_interval: u64,
    /// Root directory for the ledger store and blob files
    pub data_dir: PathBuf,
    /// HTTP server port
    pub server_port: u16,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BUDGET_BYTES` - Byte budget (default: 50 MiB)
    /// - `LOW_WATER_RATIO` - Sweep target as a fraction of the budget (default: 0.8)
    /// - `CHUNK_SIZE` - Chunk size in bytes (default: 1 MiB)
    /// - `CHUNK_THRESHOLD` - Chunking threshold in bytes (default: 5 x chunk size)
    /// - `EVICTION_TRIGGER` - `startup` or `after_write` (default: startup)
    /// - `EVICTION_INTERVAL` - Periodic sweep interval in seconds (default: 0, off)
    /// - `DATA_DIR` - Storage root (default: ./reader-cache-data)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let low_water_ratio = env_or("LOW_WATER_RATIO", defaults.low_water_ratio);
        let low_water_ratio = if (0.0..=1.0).contains(&low_water_ratio) {
            low_water_ratio
        } else {
            defaults.low_water_ratio
        };

        let chunk_size = match env_or("CHUNK_SIZE", defaults.chunk_size) {
            0 => defaults.chunk_size,
            size => size,
        };

        Self {
            budget_bytes: env_or("CACHE_BUDGET_BYTES", defaults.budget_bytes),
            low_water_ratio,
            chunk_size,
            chunk_threshold: env_or("CHUNK_THRESHOLD", chunk_size * DEFAULT_THRESHOLD_CHUNKS),
            eviction_trigger: env_or("EVICTION_TRIGGER", defaults.eviction_trigger),
            eviction_interval: env_or("EVICTION_INTERVAL", defaults.eviction_interval),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            budget_bytes: DEFAULT_BUDGET_BYTES,
            low_water_ratio: DEFAULT_LOW_WATER_RATIO,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_threshold: DEFAULT_CHUNK_SIZE * DEFAULT_THRESHOLD_CHUNKS,
            eviction_trigger: EvictionTrigger::Startup,
            eviction_interval: 0,
            data_dir: PathBuf::from("./reader-cache-data"),
            server_port: 3000,
        }
    }
}
