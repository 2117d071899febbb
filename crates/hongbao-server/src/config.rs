//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Explicit database file path. When unset the store picks the
    /// platform-appropriate data directory.
    /// Env: `DB_PATH`
    pub db_path: Option<PathBuf>,

    /// Admin API bearer token. Required to access /admin/* endpoints.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (admin API disabled).
    pub admin_token: Option<String>,

    /// How long a packet stays claimable after creation.
    /// Env: `PACKET_EXPIRY_SECS`
    /// Default: 300 (5 minutes)
    pub packet_expiry: Duration,

    /// How often the background expiry sweep runs.
    /// Env: `SWEEP_INTERVAL_SECS`
    /// Default: 30
    pub sweep_interval: Duration,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Hongbao Node"`
    pub instance_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            db_path: None,
            admin_token: None,
            packet_expiry: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(30),
            instance_name: "Hongbao Node".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(token) = std::env::var("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if let Ok(val) = std::env::var("PACKET_EXPIRY_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.packet_expiry = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid PACKET_EXPIRY_SECS, using default"),
            }
        }

        if let Ok(val) = std::env::var("SWEEP_INTERVAL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.sweep_interval = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid SWEEP_INTERVAL_SECS, using default"),
            }
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
