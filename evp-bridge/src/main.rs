//! evp-bridge - Main entry point
//!
//! Serves the video player command API over HTTP with per-session SSE event
//! streams, backed by the simulated media engine.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use evp_bridge::assets::BundleAssetResolver;
use evp_bridge::config::{BridgeConfig, ConfigOverrides, LoggingConfig};
use evp_bridge::engine::SimulatedEngine;
use evp_bridge::surface::LocalSurfaceAllocator;
use evp_bridge::CommandDispatcher;

/// Command-line arguments for evp-bridge
#[derive(Parser, Debug)]
#[command(name = "evp-bridge")]
#[command(about = "Embedded video player bridge")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "EVP_PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for bundled assets
    #[arg(short, long, env = "EVP_ASSET_ROOT")]
    asset_root: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "EVP_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        BridgeConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(ConfigOverrides {
        port: args.port,
        asset_root: args.asset_root,
        log_level: args.log_level,
    });

    init_tracing(&config.logging)?;

    info!("Starting evp-bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("Asset root: {}", config.asset_root);

    let engine = SimulatedEngine::new(config.engine.simulated());
    let clock = engine.spawn_clock(config.engine.tick_interval());

    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::new(LocalSurfaceAllocator::new()),
        Arc::new(engine),
        Arc::new(BundleAssetResolver::new(config.asset_root.clone())),
    ));

    let ip: IpAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address))?;
    let addr = SocketAddr::new(ip, config.port);

    evp_bridge::api::run(addr, Arc::clone(&dispatcher), shutdown_signal())
        .await
        .context("Server error")?;

    let disposed = dispatcher.dispose_all();
    clock.abort();
    info!("Server shutdown complete ({} session(s) disposed)", disposed);
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if logging.level == "info" {
            "evp_bridge=info,evp_common=info,tower_http=info".into()
        } else {
            EnvFilter::new(&logging.level)
        }
    });

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
