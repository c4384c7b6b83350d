//! courier - echo and account server
//!
//! A TCP server speaking length-prefixed protobuf packets.

use clap::Parser;
use courier_server::{Config, Server};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "TCP echo and account server")]
#[command(version)]
struct Args {
    /// Path to a YAML config file (defaults to $COURIER_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration before logging so the configured level applies
    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    tracing::info!("Starting courier server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Max connections: {}", config.network.max_connections);
    tracing::info!("  Max frame size: {} bytes", config.network.max_frame_bytes);
    match config.network.idle_timeout() {
        Some(timeout) => tracing::info!("  Idle timeout: {}s", timeout.as_secs()),
        None => tracing::info!("  Idle timeout: disabled"),
    }
    tracing::info!(
        "  Usernames: {}-{} chars, bcrypt cost: {}",
        config.accounts.min_username_len,
        config.accounts.max_username_len,
        config.accounts.hash_cost
    );

    let server = Arc::new(Server::from_config(&config)?);

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    tracing::info!("{}", server.sessions().stats());
    tracing::info!("Server stopped");
    Ok(())
}
