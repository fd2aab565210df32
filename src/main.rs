//! Definition gateway
//!
//! Serves HTTP endpoints declared in definition files, hot-reloading them as
//! the files change.
//!
//! # Architecture Overview
//!
//! ```text
//!     definition files ──▶ watcher ──▶ registry ──▶ RouteTable (ArcSwap)
//!                                        │                 │
//!                                 parser + factory         │
//!                                                          ▼
//!     Client Request ──▶ http server ──▶ table lookup ──▶ handler
//!                                                          │
//!                                          sql / document / cache / route
//!                                                          │
//!     Client Response ◀── envelope ◀── shaping ◀───────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use definition_gateway::collaborators::GatewayContext;
use definition_gateway::config::{load_config, GatewayConfig};
use definition_gateway::lifecycle::{self, signals, Shutdown};
use definition_gateway::observability::{init_tracing, metrics};

#[derive(Parser)]
#[command(name = "definition-gateway")]
#[command(about = "Declarative API gateway driven by definition files", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `definitions.directory`
    #[arg(short, long)]
    definitions: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(dir) = args.definitions {
        config.definitions.directory = dir;
    }

    init_tracing(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        definitions = %config.definitions.directory.display(),
        request_timeout_secs = config.timeouts.request_secs,
        "definition-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = GatewayContext::from_config(&config)?;
    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let gateway = lifecycle::start(&config, context, &shutdown).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    gateway.serve(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
