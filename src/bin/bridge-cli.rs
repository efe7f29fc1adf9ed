use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use log_bridge::config::{load_config, LoggerSettings};
use log_bridge::emitter::Emitter;
use log_bridge::env::{Side, StaticEnvironment};
use log_bridge::event::{generate_request_id, EventBase, RequestEvent, RequestSuccess};
use log_bridge::logger::{resolve_endpoint, ConfigPatch, UniversalLogger};

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Helper CLI for the log bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a synthetic request_success envelope through the client dispatch path
    Send {
        /// Base URL of the ingestion server
        #[arg(short, long, default_value = "http://localhost:3000")]
        origin: String,

        /// Ingestion path
        #[arg(short, long, default_value = "/api/logs")]
        endpoint: String,

        /// Url reported in the envelope
        #[arg(short, long, default_value = "/cli/ping")]
        url: String,
    },
    /// Load and validate a configuration file
    CheckConfig {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            origin,
            endpoint,
            url,
        } => send(origin, endpoint, url).await?,
        Commands::CheckConfig { path } => match load_config(&path) {
            Ok(config) => {
                println!("{} is valid", path.display());
                println!("{}", toml::to_string_pretty(&config)?);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

async fn send(origin: String, endpoint: String, url: String) -> Result<(), Box<dyn std::error::Error>> {
    let settings = LoggerSettings {
        client_log_endpoint: endpoint,
        server_origin: Some(origin),
        auto_setup_interceptors: false,
        ..LoggerSettings::default()
    };
    let target = resolve_endpoint(&settings)?;

    let failed = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let failed_hook = failed.clone();
    let logger = UniversalLogger::builder()
        .environment(Arc::new(StaticEnvironment::client()))
        .emitter(Emitter::null())
        .settings(settings)
        .patch(ConfigPatch::new().on_error(move |e| {
            eprintln!("Error: {}", e);
            failed_hook.store(true, std::sync::atomic::Ordering::SeqCst);
        }))
        .build();

    let event = RequestEvent::RequestSuccess(RequestSuccess {
        base: EventBase::new(generate_request_id(), url, "GET", "bridge-cli", Side::Client),
        status: 200,
        status_text: Some("OK".to_string()),
        duration: 0,
        response_headers: None,
        response_body: None,
        cached: None,
    });
    let request_id = event.request_id().to_string();
    logger.dispatch(event).await;

    if failed.load(std::sync::atomic::Ordering::SeqCst) {
        std::process::exit(1);
    }
    println!("sent {} to {}", request_id, target);
    Ok(())
}
