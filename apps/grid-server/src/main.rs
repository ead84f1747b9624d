//! Grid store server.
//!
//! Hosts an in-memory grid behind the HTTP API so that several clients
//! can share tables and their lock cells.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gridlock_api::{config::ServerConfig, router::Router, server::Server};
use gridlock_core::{GridBackend, MemoryGrid, StoreId};
use tokio::signal;

/// Command-line arguments for the grid server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; flags given on the command line win
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host address to bind to
    #[arg(long)]
    host: Option<String>,

    /// Request body timeout in milliseconds
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Store to create at startup (repeatable)
    #[arg(long = "store")]
    stores: Vec<String>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(timeout) = self.request_timeout_ms {
            config.request_timeout_ms = timeout;
        }
        config.stores.extend(self.stores);
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let config = args.into_config()?;
    let grid = Arc::new(MemoryGrid::new());
    for reference in &config.stores {
        let store = StoreId::parse(reference)
            .with_context(|| format!("Invalid startup store '{}'", reference))?;
        grid.create_store(&store)?;
        tracing::info!("Created store {}", store);
    }

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address()))?;
    tracing::info!(
        "Starting grid server on {} (request timeout {} ms, {} stores)",
        addr,
        config.request_timeout_ms,
        config.stores.len()
    );

    let router = Router::new(grid, Arc::new(config))
        .map_err(|e| anyhow::anyhow!("Failed to build router: {}", e))?;
    let server = Server::new(addr, router);

    tokio::select! {
        result = server.serve() => result.context("Server error")?,
        result = signal::ctrl_c() => {
            result.context("Failed to listen for ctrl_c")?;
            tracing::info!("Shutting down grid server");
        }
    }
    Ok(())
}
