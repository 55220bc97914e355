//! eyescalar-extract - Main entry point
//!
//! Scans a folder of fixation, message and saccade reports and writes the
//! per-session scalar tables plus a JSON dump of all session records.
//!
//! **Usage:**
//! ```bash
//! eyescalar-extract [--reports DIR] [--overview FILE] [--output DIR] \
//!     [--config FILE] [--dt-cutoff MS] [--failure-rate]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use eyescalar_common::config::{load_config, resolve_config_path};
use eyescalar_common::Overview;
use eyescalar_extract::{output, Extractor, ReportFiles};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt};

const DEFAULT_REPORTS: &str = "./reports";
const DEFAULT_OVERVIEW: &str = "./overview.toml";
const DEFAULT_OUTPUT: &str = "./extracted_data";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for eyescalar-extract
#[derive(Parser, Debug)]
#[command(name = "eyescalar-extract")]
#[command(about = "Extract per-session scalars from eye-tracking reports")]
#[command(version)]
struct Args {
    /// Folder containing *_fix.xls, *_msg.xls and *_sac.xls reports
    #[arg(long, env = "EYESCALAR_REPORTS")]
    reports: Option<PathBuf>,

    /// Subject overview (TOML)
    #[arg(long, env = "EYESCALAR_OVERVIEW")]
    overview: Option<PathBuf>,

    /// Folder receiving the extracted tables
    #[arg(long, env = "EYESCALAR_OUTPUT")]
    output: Option<PathBuf>,

    /// Config file (overrides EYESCALAR_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inter-fixation gaps longer than this are truncated (ms)
    #[arg(long, env = "EYESCALAR_DT_CUTOFF")]
    dt_cutoff: Option<i64>,

    /// Run the density-based disc classifier and report failure rates
    #[arg(long)]
    failure_rate: bool,
}

fn main() -> Result<()> {
    let started = chrono::Utc::now();

    // Initialize tracing first; without RUST_LOG the configured level is
    // applied once the config file has been read
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().ok();
    let level_from_env = env_filter.is_some();
    let (filter, filter_handle) = reload::Layer::new(
        env_filter.unwrap_or_else(|| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_LEVEL)),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;
    if !level_from_env {
        filter_handle
            .reload(tracing_subscriber::EnvFilter::new(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    info!(
        "Starting eyescalar-extract (git {}, built {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let mut extraction = config.extraction;
    if let Some(cutoff) = args.dt_cutoff {
        extraction.dt_cutoff_ms = cutoff;
    }
    if args.failure_rate {
        extraction.failure_rate = true;
    }

    let reports = args
        .reports
        .or(config.paths.reports)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS));
    let overview_path = args
        .overview
        .or(config.paths.overview)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OVERVIEW));
    let output_dir = args
        .output
        .or(config.paths.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    info!(
        "Gap cutoff: {} ms, density classifier: {}",
        extraction.dt_cutoff_ms,
        if extraction.failure_rate { "on" } else { "off" }
    );

    let overview = Overview::load(&overview_path)
        .with_context(|| format!("Failed to load subject overview {}", overview_path.display()))?;
    info!("Loaded {} subjects from {}", overview.len(), overview_path.display());

    let files = ReportFiles::scan(&reports)
        .with_context(|| format!("Failed to scan report folder {}", reports.display()))?;
    if files.is_empty() {
        warn!("No report files found in {}", reports.display());
    }

    let extractor = Extractor::new(extraction, overview).context("Invalid extraction parameters")?;
    let results = extractor.run(&files).context("Extraction failed")?;

    let written = output::write_all(&results, &output_dir, extractor.config())
        .with_context(|| format!("Failed to write results to {}", output_dir.display()))?;

    let with_triggers = results.iter().filter(|r| r.triggers.is_some()).count();
    let with_saccades = results.iter().filter(|r| r.saccades.is_some()).count();
    info!(
        "Extracted {} sessions ({} with triggers, {} with saccades), {} files written to {} in {} ms",
        results.len(),
        with_triggers,
        with_saccades,
        written.len(),
        output_dir.display(),
        (chrono::Utc::now() - started).num_milliseconds()
    );

    Ok(())
}
