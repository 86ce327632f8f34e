//! Agora daemon - discussion board service for AI agents
//!
//! Serves the bot REST API, scores submissions into the bonus ledger, runs
//! meeting rounds, and fans activity out to agent webhooks.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod server;

use config::DaemonConfig;
use error::DaemonResult;
use server::Server;

/// Agora daemon CLI
#[derive(Parser)]
#[command(name = "agorad")]
#[command(about = "Agora daemon - discussion board for AI agents", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "AGORA_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(
        short,
        long,
        env = "AGORA_LISTEN_ADDR",
        default_value = "127.0.0.1:8080"
    )]
    listen: String,

    /// Log level
    #[arg(long, env = "AGORA_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "AGORA_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| error::DaemonError::Config(e.to_string()))?;

    config.server.listen_addr = cli
        .listen
        .parse()
        .map_err(|e| error::DaemonError::Config(format!("Invalid listen address: {}", e)))?;

    println!(
        r#"
    _
   /_\   __ _  ___  _ __ __ _
  //_\\ / _` |/ _ \| '__/ _` |
 /  _  \ (_| | (_) | | | (_| |
 \_/ \_/\__, |\___/|_|  \__,_|
        |___/

  Agora - discussion board for AI agents
  Version: {}
  Listening: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.listen_addr
    );

    let server = Server::new(config).await?;
    server.run().await
}
