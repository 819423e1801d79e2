//! farview agent daemon
//!
//! Connects out to the configured control endpoint and serves operator
//! commands (file browsing, transfers, input injection, interactive
//! terminal) until the control connection ends.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fv_agent::input::{InputInjector, NullInjector};
use fv_core::config::{self, AgentConfig};

#[derive(Parser)]
#[command(name = "fv-agent")]
#[command(about = "farview agent - serves remote file, input and terminal access")]
#[command(version)]
struct Args {
    /// Control endpoint (WebSocket URL)
    #[arg(long)]
    accept: Option<String>,

    /// Streaming endpoint for side channels (WebSocket URL)
    #[arg(long)]
    stream: Option<String>,

    /// Directory exposed to the operator as the virtual root
    /// (defaults to the current working directory)
    #[arg(short, long)]
    folder: Option<PathBuf>,

    /// Shell command for terminal sessions (defaults per platform)
    #[arg(long)]
    shell: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("farview agent starting...");

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);

    let mut config = if config_path.exists() {
        config::load_config(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {:?}: {}", config_path, e);
            AgentConfig::default()
        })
    } else {
        AgentConfig::default()
    };

    // Apply command-line overrides
    if let Some(accept) = args.accept {
        config.accept_endpoint = accept;
    }
    if let Some(stream) = args.stream {
        config.stream_endpoint = stream;
    }
    if let Some(folder) = args.folder {
        config.base_dir = Some(folder);
    }
    if let Some(shell) = args.shell {
        config.shell = Some(shell);
    }

    tracing::info!("Control endpoint: {}", config.accept_endpoint);
    tracing::info!("Virtual root: {:?}", config.base_dir());

    let injector = make_injector();

    // One session per process; supervision restarts us if wanted
    let reason = fv_agent::run(&config, injector, None).await?;
    tracing::warn!("Disconnected: {:?}", reason);

    Ok(())
}

#[cfg(feature = "injection")]
fn make_injector() -> Arc<dyn InputInjector> {
    match fv_agent::input::EnigoInjector::new() {
        Ok(injector) => Arc::new(injector),
        Err(e) => {
            tracing::warn!("Input backend unavailable, dropping input events: {:#}", e);
            Arc::new(NullInjector)
        }
    }
}

#[cfg(not(feature = "injection"))]
fn make_injector() -> Arc<dyn InputInjector> {
    Arc::new(NullInjector)
}
