//! Reader Cache - resource cache for an EPUB reader's background helper
//!
//! Serves the cache's message interface over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reader_cache::api::{create_router, AppState};
use reader_cache::storage::{DirBlobCache, JsonFileStore};
use reader_cache::{spawn_eviction_task, Config};

/// Main entry point for the Reader Cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the ledger store and blob cache under the data directory
/// 4. Run the startup eviction sweep
/// 5. Start the periodic eviction task, if configured
/// 6. Serve the router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reader_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Reader Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: budget={} bytes, low_water_ratio={}, chunk_size={}, chunk_threshold={}, trigger={:?}, eviction_interval={}s, data_dir={}, port={}",
        config.budget_bytes,
        config.low_water_ratio,
        config.chunk_size,
        config.chunk_threshold,
        config.eviction_trigger,
        config.eviction_interval,
        config.data_dir.display(),
        config.server_port
    );

    let store = JsonFileStore::open(config.data_dir.join("ledger"))
        .await
        .context("opening ledger store")?;
    let blobs = DirBlobCache::open(&config.data_dir)
        .await
        .context("opening blob cache")?;
    let state = AppState::from_config(&config, Arc::new(store), Arc::new(blobs));
    info!("Resource cache initialized");

    // Startup sweep; a failure leaves the cache over budget until the next one
    match state.cache.sweep().await {
        Ok(report) => info!(
            "Startup sweep: evicted {} resources, usage {} bytes",
            report.evicted.len(),
            report.bytes_after
        ),
        Err(e) => error!("Startup sweep failed: {}", e),
    }

    let sweep_handle = (config.eviction_interval > 0)
        .then(|| spawn_eviction_task(state.cache.clone(), config.eviction_interval));

    let app = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("serving")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the eviction task and allows graceful shutdown.
async fn shutdown_signal(sweep_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = sweep_handle {
        handle.abort();
        warn!("Eviction task aborted");
    }
}
