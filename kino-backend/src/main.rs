use kino_backend::app::App;
use kino_backend::config;
use kino_backend::delivery::{DeliveryState, build_router};
use kino_backend::provider::build_providers;
use kino_backend::storage::{MemoryStorage, SnapshotCache};

use anyhow::{Context, Result};
use kino_common::Storage;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::read_config(&config_path)?;

    // Initialize logging
    let _logging_guard = kino_backend::logging::init_logging(
        &config.log_dir,
        "kino-backend",
        &config.log_level,
    )?;

    tracing::info!("Kino backend starting...");
    tracing::info!("Server will listen on {}", config.server_address());

    let storage = Arc::new(MemoryStorage::new());
    let providers = build_providers(&config.providers)?;
    tracing::info!("Configured providers: {}", config.providers.join(", "));

    let mut app = App::new(config.app_config())
        .with_storage(storage.clone())
        .with_providers(providers);

    // Restore the last snapshot, if any
    if let Some(path) = &config.snapshot_path {
        let snapshot = SnapshotCache::new(path);
        match snapshot.restore(storage.as_ref()).await {
            Ok(count) => tracing::info!("Restored {} screenings from snapshot", count),
            Err(e) => tracing::warn!("Starting with an empty store: {:#}", e),
        }
        app = app.with_snapshot(snapshot);
    }

    let app = Arc::new(app);
    app.start_background_sync()
        .await
        .context("Failed to start background sync")?;

    let router = build_router(
        DeliveryState {
            app: app.clone(),
            max_age: config.max_age(),
        },
        &config.static_dir,
    );

    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Server starting on http://{}", config.server_address());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down...");
    app.stop_background_sync().await;

    if let Some(path) = &config.snapshot_path {
        match SnapshotCache::new(path).save(storage.as_ref()).await {
            Ok(count) => tracing::info!("Saved {} screenings to snapshot", count),
            Err(e) => tracing::error!("Failed to save snapshot: {:#}", e),
        }
    }

    tracing::info!("Server stopped ({} screenings in store)", storage.len().await);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
