//! Paywatch Service - HTTP API for payment monitoring
//!
//! This is the main entry point for the paywatch service.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paywatch_service::{create_router, AppState, ServiceConfig};
use paywatch_store::{RocksStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,paywatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Paywatch Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        stripe_configured = %config.stripe_api_key.is_some(),
        webhook_verification = %config.stripe_webhook_secret.is_some(),
        "Service configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    // Background reaper: physically drop expired cache entries.
    spawn_cache_reaper(Arc::clone(&store), config.reaper_interval_seconds);

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically sweep expired cache entries. Expiry is already enforced on
/// every read; this only reclaims the space.
fn spawn_cache_reaper(store: Arc<RocksStore>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let store = Arc::clone(&store);
            let result =
                tokio::task::spawn_blocking(move || store.purge_expired(chrono::Utc::now())).await;

            match result {
                Ok(Ok(purged)) if purged > 0 => {
                    tracing::info!(purged, "Cache reaper removed expired entries");
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Cache reaper sweep failed"),
                Err(e) => tracing::error!(error = %e, "Cache reaper task failed"),
            }
        }
    });
}
