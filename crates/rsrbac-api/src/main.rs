//! RSRBAC Server Binary
//!
//! RBAC admin API with a gatekeeping middleware pipeline.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! rsrbac --config config.yaml
//!
//! # With environment variables only
//! RSRBAC_TOKEN__SECRET=change-me rsrbac
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dashmap::DashMap;
use tokio::signal;
use tracing::{info, Level};

use rsrbac_api::config::AppConfig;
use rsrbac_api::http::{create_router, AppState};
use rsrbac_api::observability::{init_logging, LoggingConfig};
use rsrbac_domain::TokenService;
use rsrbac_storage::MemoryRbacStore;

/// RSRBAC - RBAC Admin API Server
#[derive(Parser, Debug)]
#[command(name = "rsrbac")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        AppConfig::load(&config_path)?
    } else {
        AppConfig::from_env()?
    };

    let log_config = LoggingConfig {
        json_format: config.logging.json,
        default_level: parse_log_level(&config.logging.level),
    };
    init_logging(log_config);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting RSRBAC server");

    let token_service = Arc::new(TokenService::new(
        config.token.secret.clone(),
        config.token.ttl_millis,
    )?);

    let store = MemoryRbacStore::new_shared();
    info!("Using in-memory storage backend");

    let buckets = Arc::new(DashMap::new());
    let state = AppState::new(store, token_service);
    let router = create_router(state, &config, buckets);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Parse log level from string.
fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
