//! siren-scan - offline siren conflict scan
//!
//! Runs the same scan as the upload service against a local zip archive or
//! an already unpacked directory, and prints the report.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sirenscan::services::{scan_archive, scan_directory};
use sirenscan_common::config::TomlConfig;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "siren-scan")]
#[command(about = "Report siren IDs shared across content packs")]
#[command(version)]
struct Args {
    /// Zip archive or directory to scan
    path: PathBuf,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML config file (only the [limits] and [logging] tables are used)
    #[arg(short, long, env = "SIRENSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, _source) =
        TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    let level = args.log_level.unwrap_or(config.logging.level);

    // Logs go to stderr so the report can be piped
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let outcome = if args.path.is_dir() {
        info!("Scanning directory {}", args.path.display());
        scan_directory(&args.path, &config.limits)?
    } else {
        info!("Scanning archive {}", args.path.display());
        let file = File::open(&args.path)
            .with_context(|| format!("Failed to open {}", args.path.display()))?;
        scan_archive(BufReader::new(file), &config.limits)?
    };

    if !outcome.extraction.skipped.is_empty() {
        warn!(
            "{} of {} metadata files could not be parsed and were left out",
            outcome.extraction.skipped.len(),
            outcome.extraction.files_matched
        );
    }
    info!(
        "{} records, {} conflicting siren IDs",
        outcome.extraction.records.len(),
        outcome.conflicts.len()
    );

    let report = outcome.report();
    match &args.output {
        Some(path) => {
            std::fs::write(path, &report)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => {
            io::stdout().lock().write_all(report.as_bytes())?;
        }
    }

    Ok(())
}
