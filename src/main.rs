//! Splitround - bill-splitting ledger backend
//!
//! Tracks per-person prices and balances, suggests the next payer, executes
//! settlement rounds, and keeps an append-only history log behind a REST API.

use anyhow::{Context, Result};
use axum::middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splitround_backend::{
    api::create_router, middleware::request_logging, Config, LedgerStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(db_path = %config.db_path, "Starting splitround backend");

    let store = LedgerStore::open(
        &config.db_path,
        config.conflict_policy,
        config.seed_defaults,
        config.rng_seed,
    )
    .context("Failed to open ledger store")?;

    let app = create_router(Arc::new(store))
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with env-filter support.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "splitround_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
