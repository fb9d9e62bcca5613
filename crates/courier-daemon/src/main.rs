//! # courier-daemon
//!
//! Courier server binary — wires configuration, logging, and metrics
//! together and starts the HTTP/WebSocket server.

#![deny(unsafe_code)]

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use courier_server::config::ServerConfig;
use courier_server::server::CourierServer;
use courier_server::{metrics, shutdown};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long to wait for in-flight connections after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Courier notification server.
#[derive(Parser, Debug)]
#[command(name = "courierd", about = "Real-time notification delivery server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "4650")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let recorder = metrics::install_recorder();

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        ..ServerConfig::default()
    };
    let server = CourierServer::new(config, Some(recorder));

    let (addr, serve_handle) = server.listen().await.context("failed to bind server")?;
    info!(%addr, "courier ready");

    let cancel = server.shutdown_token();
    let _signal = tokio::spawn(shutdown::shutdown_signal(cancel.clone()));

    cancel.cancelled().await;
    match tokio::time::timeout(DRAIN_TIMEOUT, serve_handle).await {
        Ok(joined) => joined.context("server task panicked")?,
        Err(_) => warn!("shutdown timed out after {DRAIN_TIMEOUT:?}, dropping open connections"),
    }

    Ok(())
}
