//! log-bridge ingestion server.
//!
//! Loads the configuration, installs logging and metrics, then serves the
//! envelope endpoint until Ctrl+C.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use log_bridge::config::{load_config, BridgeConfig};
use log_bridge::emitter::Emitter;
use log_bridge::env::{Environment, SystemEnvironment};
use log_bridge::ingest::{shutdown_signal, IngestServer};
use log_bridge::observability::{init_logging, metrics};

#[derive(Parser)]
#[command(name = "log-bridge")]
#[command(about = "Ingestion server for client-side request logs", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let env: Arc<dyn Environment> = Arc::new(SystemEnvironment);

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.ingest.bind_address = bind;
    }

    init_logging(env.as_ref(), config.observability.log_format)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        side = %env.side(),
        development = env.is_development(),
        "log-bridge starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.ingest.bind_address).await?;
    let emitter = Emitter::root(env.as_ref());
    let server = IngestServer::new(config.ingest, emitter, env);
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
