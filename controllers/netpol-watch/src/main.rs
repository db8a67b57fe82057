//! NetworkPolicy Watch Controller
//!
//! Keeps long-lived watches open on the resources a node-local network
//! policy agent consumes:
//! - NetworkPolicy: policies in the watched namespace (or all namespaces)
//! - Pod: pods scheduled on this node
//! - Namespace: every namespace
//!
//! Each watch is re-opened whenever the API server closes it, until the
//! process receives Ctrl-C or SIGTERM.

mod config;
mod controller;
mod error;
mod events;
mod watcher;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting NetworkPolicy Watch Controller");

    // Load configuration from environment variables
    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Node: {}", config.node_name);
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Relay buffer size: {}", config.buffer_size);
    match config.watch_timeout_secs {
        Some(secs) => info!("  Watch timeout: {}s", secs),
        None => info!("  Watch timeout: server default"),
    }

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    info!("NetworkPolicy Watch Controller stopped");
    Ok(())
}
