//! Smart Farming Gateway (v1)
//!
//! Reverse proxy between the farming web app and its ML prediction service.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  GATEWAY                     │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│ handlers │──▶│ upstream  │──┼──▶ Prediction
//!                      │  │ server  │   │ + upload │   │  client   │  │     service
//!                      │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                      │                                     │        │
//!   Client Response    │  ┌──────────┐   ┌────────────┐      │        │
//!   ◀──────────────────┼──│ response │◀──│ resilience │◀─────┘        │
//!                      │  │  shaping │   │ classifier │               │
//!                      │  └──────────┘   └────────────┘               │
//!                      │                                              │
//!                      │  config · health prober · observability ·    │
//!                      │  security (CORS) · lifecycle                 │
//!                      └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use farm_gateway::config::load_from_env;
use farm_gateway::lifecycle::startup;
use farm_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "farm-gateway")]
#[command(about = "Gateway between the Smart Farming app and its ML service", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the prediction service base URL.
    #[arg(long)]
    upstream_url: Option<String>,

    /// Override the listening port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_from_env(cli.config.as_deref())?;
    if let Some(url) = cli.upstream_url {
        config.upstream.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(port) = cli.port {
        config.listener.set_port(port);
    }
    farm_gateway::config::validation::validate_config(&config)
        .map_err(farm_gateway::config::ConfigError::Validation)?;

    init_logging(&config.observability);
    tracing::info!("farm-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
