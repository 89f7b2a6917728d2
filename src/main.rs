//! ollama-gate
//!
//! Exposes a local inference backend's HTTP API behind API-key auth.
//!
//! # Architecture Overview
//!
//! ```text
//! Caller ──▶ ┌──────────┐   ┌───────────┐   ┌──────────────┐
//!            │   http   │──▶│ security  │──▶│   routing    │
//!            │  server  │   │ auth gate │   │  operation   │
//!            └──────────┘   └───────────┘   └──────┬───────┘
//!                                                  │
//!                             unary ┌──────────────┴─┐ streaming
//!                                   ▼                ▼
//!                            ┌────────────┐   ┌─────────────┐
//!                            │  upstream  │◀──│ http/relay  │
//!                            │ client+pool│   │ stream state│
//!                            └─────┬──────┘   └─────────────┘
//!                                  ▼
//!                          Inference backend
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ollama_gate::config;
use ollama_gate::observability::{logging, metrics};
use ollama_gate::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "ollama-gate")]
#[command(about = "Authenticated reverse proxy for a local LLM inference backend", long_about = None)]
struct Cli {
    /// TOML configuration file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability.log_level);

    if cli.check {
        tracing::info!(
            bind_address = %config.listener.bind_address,
            upstream = %config.upstream.base_url,
            api_keys = config.auth.api_keys.len(),
            "Configuration is valid"
        );
        return Ok(());
    }

    tracing::info!("ollama-gate v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown.clone().trigger_on_signal());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
