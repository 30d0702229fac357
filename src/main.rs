//! Keyward - key registry service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyward::{config::Args, registry::KeyRegistry, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("keyward={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let source = args.key_source();

    // Print startup banner
    info!("======================================");
    info!("  Keyward - Key Registry Service");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Source: {}", source.describe());
    info!(
        "Mutations: {}",
        if source.is_durable() {
            "persisted"
        } else {
            "memory-only"
        }
    );
    info!("======================================");

    // Populate the registry from its source. A missing local file starts
    // empty; an unreachable remote is fatal at boot.
    let registry = Arc::new(KeyRegistry::new(source));
    if let Err(e) = registry.load().await {
        error!("Failed to load key store: {}", e);
        std::process::exit(1);
    }
    info!(count = registry.len().await, "Registry ready");

    // Run the server
    let state = Arc::new(server::AppState::new(args, registry));
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
