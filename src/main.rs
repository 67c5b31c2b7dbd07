//! Storefront request guard service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace ─▶ timeout
//!                                              │
//!                                              ▼
//!                      ┌──────────────────────────────────────────┐
//!                      │ sanitize: detect (400) → rewrite in place │
//!                      │ csrf: double-submit / origin / session    │
//!                      │       token (403)                         │
//!                      └───────────────────┬──────────────────────┘
//!                                          ▼
//!                      ┌──────────────────────────────────────────┐
//!                      │ handlers: login (lockout, 401), logout,   │
//!                      │ csrf token issue, echo, admin             │
//!                      └──────────────────────────────────────────┘
//!
//!     Cross-cutting: config (TOML + hot reload), observability
//!     (tracing, Prometheus, security audit), lifecycle (signals,
//!     graceful shutdown), sweeper (expiry of in-memory stores)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use storefront_guard::config::watcher::ConfigWatcher;
use storefront_guard::config::{load_config, GuardConfig};
use storefront_guard::http::HttpServer;
use storefront_guard::lifecycle::{wait_for_signal, Shutdown};
use storefront_guard::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "storefront-guard")]
#[command(about = "CSRF, login lockout and input sanitization guard for the storefront API", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("storefront-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = ?config.environment,
        max_attempts = config.lockout.max_attempts,
        csrf_ttl_secs = config.csrf.token_ttl_secs,
        users = config.users.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => (tokio::sync::mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
