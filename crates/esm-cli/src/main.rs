//! ESM CLI - Command-line interface for the Elasticsearch connection manager
//!
//! Provides `esm connection` and `esm health`.

mod commands;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use esm_core::{ConnectionStore, HttpClientFactory, StoreConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::connection::ConnectionCommands;

#[derive(Parser)]
#[command(name = "esm")]
#[command(about = "ESM - Elasticsearch connection manager")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage cluster connections
    Connection {
        #[command(subcommand)]
        action: ConnectionCommands,
    },
    /// Check connectivity of a connection (defaults to the current one)
    Health {
        /// Connection ID
        id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ESM_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_store() -> anyhow::Result<ConnectionStore> {
    let config = StoreConfig::from_env();
    Ok(ConnectionStore::open(&config, Arc::new(HttpClientFactory))?)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut store = open_store()?;
    match cli.command {
        Commands::Connection { action } => commands::connection::execute(action, &mut store).await,
        Commands::Health { id, json } => {
            commands::health::execute(id.as_deref(), json, &mut store).await
        }
    }
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
