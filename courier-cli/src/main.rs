//! courier-cli - Command-line interface for courier
//!
//! Provides both a REPL and one-shot command execution.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use courier_client::{Client, ConnectionConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "courier-cli")]
#[command(about = "Command-line interface for the courier echo and account server")]
#[command(version)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080", env = "COURIER_SERVER")]
    server: SocketAddr,

    /// Print responses as JSON
    #[arg(long)]
    json: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start interactive REPL
    Repl,

    /// Send text and print what the server echoes back
    Echo {
        /// Text to send
        text: String,
    },

    /// Register a new account
    Register {
        /// Username (letters, digits and underscores)
        username: String,
        /// Password
        password: String,
    },

    /// Log in to an existing account
    Login {
        /// Username
        username: String,
        /// Password
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config =
        ConnectionConfig::new(cli.server).with_request_timeout(Duration::from_secs(cli.timeout));
    let client = Client::new(config);

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(client, cli.server, cli.json).await?;
        }
        Some(cmd) => {
            if let Err(e) = client.connect().await {
                eprintln!("{}: {}", "Connection failed".red(), e);
                std::process::exit(1);
            }

            match commands::execute(&client, cmd, cli.json).await {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }

            let _ = client.close().await;
        }
    }

    Ok(())
}
