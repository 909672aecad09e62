//! Capture broker binary.

use std::path::PathBuf;

use anyhow::Result;
use broker_server::config::{Config, ENV_BACKEND_URL, ENV_BIND_ADDR, ENV_LOG_JSON, ENV_PORT};
use broker_server::{server, telemetry};
use clap::Parser;

#[derive(Parser)]
#[command(name = "capture-broker")]
#[command(about = "Relays capture-client events to the backend and backend tasks to capture clients")]
struct Cli {
    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    bind: Option<String>,

    /// Port for the WebSocket endpoint and liveness probe
    #[arg(short, long)]
    port: Option<u16>,

    /// Base URL of the control-plane backend
    #[arg(short, long)]
    backend_url: Option<String>,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// CLI flags win over the environment.
    fn lookup(&self, key: &str) -> Option<String> {
        let flag = match key {
            ENV_BIND_ADDR => self.bind.clone(),
            ENV_PORT => self.port.map(|p| p.to_string()),
            ENV_BACKEND_URL => self.backend_url.clone(),
            ENV_LOG_JSON if self.log_json => Some("true".to_string()),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_with(cli.config.as_deref(), |key| cli.lookup(key))?;

    telemetry::init_tracing(config.log_json);
    tracing::info!(
        bind = %config.bind_addr,
        port = config.port,
        backend = %config.backend_url,
        "starting capture broker"
    );

    server::run(config).await?;
    tracing::info!("capture broker exited");
    Ok(())
}
