//! # hongbao-server
//!
//! HTTP surface for the hongbao gift-packet engine.
//!
//! This binary provides:
//! - **REST API** (axum) for creating, claiming, and inspecting packets
//! - **SSE event streams** per room so chat frontends can animate drops,
//!   claims, completions, and expiries live
//! - **Background expiry sweep** that refunds unclaimed remainders to
//!   senders on a fixed interval, driven by the persisted deadline so it
//!   survives restarts
//! - **Admin endpoints** (bearer token) for wallet funding and a manual
//!   sweep trigger

mod api;
mod config;
mod error;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hongbao_engine::{EngineConfig, PacketEngine};
use hongbao_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hongbao_server=debug")),
        )
        .init();

    info!("Starting hongbao server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        instance = %config.instance_name,
        admin_enabled = config.admin_token.is_some(),
        expiry_secs = config.packet_expiry.as_secs(),
        sweep_secs = config.sweep_interval.as_secs(),
        "Instance settings"
    );

    // -----------------------------------------------------------------------
    // 3. Open the store and build the engine
    // -----------------------------------------------------------------------
    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::open_default()?,
    };

    let engine = Arc::new(PacketEngine::new(
        db,
        EngineConfig {
            expiry_window: chrono::Duration::from_std(config.packet_expiry)?,
            ..EngineConfig::default()
        },
    ));

    let app_state = AppState {
        engine: engine.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn the background expiry sweep
    // -----------------------------------------------------------------------
    let sweeper = engine.clone();
    let sweep_interval = config.sweep_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            match sweeper.sweep_expired().await {
                Ok(0) => {}
                Ok(n) => info!(refunded = n, "Expiry sweep refunded packets"),
                Err(e) => warn!(error = %e, "Expiry sweep failed"),
            }
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
