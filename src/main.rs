//! Amora - dating chat backend with conversational memory
//!
//! Server entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod middleware;
mod server;
mod websocket;

/// Amora chat backend
#[derive(Parser, Debug)]
#[command(name = "amora")]
#[command(about = "Dating chat backend: realtime relay, relationship memory, reply suggestions")]
#[command(version)]
pub struct Cli {
    /// Bind host, overriding configuration
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port, overriding configuration
    #[arg(long)]
    pub port: Option<u16>,

    /// SQLite database path, overriding configuration
    #[arg(long)]
    pub database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amora=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    server::run(cli).await
}
