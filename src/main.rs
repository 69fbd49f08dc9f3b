//! `web-init` binary: loads configuration and serves the bootstrap routes.
//!
//! # Usage
//!
//! ```bash
//! # Configuration from a JSON file
//! web-init --config config.json
//!
//! # Configuration from the environment (or a .env file)
//! WEB_INIT_PORT=8080 web-init
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use web_init::config::{self, Config};
use web_init::server::{InitArgs, WebInit};

/// HTTP server bootstrap.
#[derive(Parser)]
#[command(name = "web-init")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file; the environment is used when omitted
    #[arg(long, short, env = "WEB_INIT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config)?;
    config.print_summary();

    let server = WebInit::new(InitArgs::new(config), |_| Ok(()))?;
    server.start_server_with_shutdown(shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("Invalid log filter '{}'", config.log_level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
