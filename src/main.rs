//! HTTP context mapper.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 CONTEXT MAPPER                 │
//!     Client Request   │  ┌────────┐   ┌───────────────┐   ┌──────────┐ │
//!     ─────────────────┼─▶│  http  │──▶│    mapper     │──▶│   net    │─┼──▶ Origin
//!                      │  │ server │   │ request pass  │   │  client  │ │
//!                      │  └────────┘   └───────────────┘   └────┬─────┘ │
//!                      │                                        │       │
//!     Client Response  │  ┌────────┐   ┌───────────────┐        │       │
//!     ◀────────────────┼──│response│◀──│    mapper     │◀───────┘       │
//!                      │  │adapter │   │ response pass │                │
//!                      │  └────────┘   └───────────────┘                │
//!                      │                                                │
//!                      │  config · observability · lifecycle            │
//!                      └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use context_mapper::config::{read_config, validate_config, ConfigError, ProxyConfig};
use context_mapper::observability::{logging, metrics};
use context_mapper::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "context-mapper", version, about = "Maps requests and responses between a proxy identity and an origin")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "context-mapper.toml")]
    config: PathBuf,

    /// Override the listener bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the target origin url
    #[arg(long)]
    target: Option<String>,
}

fn load(args: &Args) -> Result<ProxyConfig, ConfigError> {
    let mut config = match read_config(&args.config) {
        Ok(config) => config,
        // A missing file is fine when the target comes from the command line
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound && args.target.is_some() => {
            ProxyConfig::default()
        }
        Err(e) => return Err(e),
    };

    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(target) = &args.target {
        config.target.url = target.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load(&args)?;

    logging::init_logging(&config.observability);
    tracing::info!("context-mapper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        target = %config.target.url,
        load_html = config.mapper.load_html,
        "Configuration loaded"
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

    let server = HttpServer::from_config(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
