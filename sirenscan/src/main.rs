//! sirenscan - siren ID conflict scanner service
//!
//! Serves an upload page at `/`, accepts zip archives at `POST /scan` and
//! returns a plain-text conflict report.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sirenscan_common::config::{ConfigSource, TomlConfig};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sirenscan::{build_router, AppState};

/// Command-line arguments for sirenscan
#[derive(Parser, Debug)]
#[command(name = "sirenscan")]
#[command(about = "Siren ID conflict scanner for vehicle metadata archives")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "SIRENSCAN_PORT")]
    port: Option<u16>,

    /// Interface address to bind (overrides config file)
    #[arg(short, long, env = "SIRENSCAN_BIND")]
    bind: Option<String>,

    /// TOML config file
    #[arg(short, long, env = "SIRENSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (overrides config file)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) =
        TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=info", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting sirenscan v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => info!("Config file: {}", path.display()),
        ConfigSource::Defaults => warn!("No config file found, using built-in defaults"),
    }

    let limits = &config.limits;
    info!(
        "Limits: upload {} bytes, unpacked {} bytes, {} entries, meta file {} bytes, {} xml nodes, {}s timeout",
        limits.max_upload_bytes,
        limits.max_extracted_bytes,
        limits.max_archive_entries,
        limits.max_meta_file_bytes,
        limits.max_xml_nodes,
        limits.scan_timeout_secs
    );

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind, config.port))?;

    let state = AppState::new(config.limits.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install signal handler: {}", e);
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
