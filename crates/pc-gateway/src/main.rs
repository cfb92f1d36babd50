//! PiControl Gateway Daemon
//!
//! Serves LAN discovery and browser-to-SSH terminal bridging over HTTP and
//! WebSocket.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pc_core::config::{self, GatewayConfig};
use pc_gateway::discovery::parse_subnet;
use pc_gateway::GatewayState;

#[derive(Parser)]
#[command(name = "pc-gateway")]
#[command(about = "PiControl LAN terminal gateway")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "PICONTROL_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(short, long, env = "PICONTROL_BIND")]
    bind: Option<String>,

    /// Default scan subnet in CIDR form (overrides config)
    #[arg(short, long)]
    subnet: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("PiControl gateway starting...");

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                GatewayConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            GatewayConfig::default()
        }
    };

    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(subnet) = &args.subnet {
        config.scan.subnet = parse_subnet(subnet).context("Invalid --subnet")?;
    }
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Default scan subnet {}, SSH port {}",
        config.scan.subnet,
        config.ssh.port
    );

    let bind_addr = config.bind_address.clone();
    let state = Arc::new(GatewayState::new(config));

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Setup signal handlers
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    pc_gateway::server::serve(state, &bind_addr, cancel).await?;

    tracing::info!("Gateway shutdown complete");
    Ok(())
}
