//! pushify-broadcaster server entry point.
//!
//! Loads configuration, connects the notification store and serves the
//! streaming, bus and reconciliation endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use pushify_broadcaster::api;
use pushify_broadcaster::app_state::AppState;
use pushify_broadcaster::config::BroadcasterConfig;
use pushify_broadcaster::persistence::{InMemoryStore, NotificationStore, PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BroadcasterConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(addr = %config.listen_addr, "starting pushify-broadcaster");

    let store: Arc<dyn NotificationStore> = if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("failed to connect to the notification store")?;
        store
            .ping()
            .await
            .context("notification store is not reachable")?;
        tracing::info!("notification store connected");
        Arc::new(store)
    } else {
        tracing::warn!("persistence disabled; using in-memory notification store");
        Arc::new(InMemoryStore::new())
    };

    let app = api::build_app(AppState::new(store, config.session));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
