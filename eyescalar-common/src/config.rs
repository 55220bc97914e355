//! Configuration loading and config file resolution
//!
//! Bootstrap configuration is a single optional TOML file. Every field has a
//! built-in default, so a missing file only produces a warning.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`EYESCALAR_CONFIG`, `EYESCALAR_DT_CUTOFF`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "EYESCALAR_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Extraction parameters
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Input/output locations (optional)
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Parameters of the fixation stream processing
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Inter-fixation gaps longer than this are truncated (ms)
    #[serde(default = "default_dt_cutoff_ms")]
    pub dt_cutoff_ms: i64,

    /// Length a truncated gap is shortened to (ms)
    #[serde(default = "default_residual_gap_ms")]
    pub residual_gap_ms: i64,

    /// Reference "previous fixation end" for the first fixation of a session (ms)
    #[serde(default = "default_origin_ms")]
    pub origin_ms: i64,

    /// Epoch length in corrected session time (ms)
    #[serde(default = "default_epoch_ms")]
    pub epoch_ms: i64,

    /// Number of epoch summaries per session record
    #[serde(default = "default_epoch_count")]
    pub epoch_count: usize,

    /// Run the density-based disc classifier
    #[serde(default)]
    pub failure_rate: bool,

    /// Session ids removed before results are written
    #[serde(default)]
    pub excluded_sessions: Vec<String>,

    /// Session names containing one of these are looked up whole, as session 1
    #[serde(default)]
    pub single_session_affixes: Vec<String>,

    /// Interest-area tag markers
    #[serde(default)]
    pub markers: MarkerConfig,
}

/// Substrings identifying interest-area tags
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_right_marker")]
    pub right: String,
    #[serde(default = "default_left_marker")]
    pub left: String,
    #[serde(default = "default_image_marker")]
    pub image: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Input/output locations
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PathsConfig {
    /// Folder scanned for report files
    #[serde(default)]
    pub reports: Option<PathBuf>,

    /// Subject overview file
    #[serde(default)]
    pub overview: Option<PathBuf>,

    /// Folder receiving the extracted tables
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_dt_cutoff_ms() -> i64 {
    200
}

fn default_residual_gap_ms() -> i64 {
    10
}

fn default_origin_ms() -> i64 {
    10_000
}

fn default_epoch_ms() -> i64 {
    60_000
}

fn default_epoch_count() -> usize {
    5
}

fn default_right_marker() -> String {
    "R".to_string()
}

fn default_left_marker() -> String {
    "L".to_string()
}

fn default_image_marker() -> String {
    "image".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dt_cutoff_ms: default_dt_cutoff_ms(),
            residual_gap_ms: default_residual_gap_ms(),
            origin_ms: default_origin_ms(),
            epoch_ms: default_epoch_ms(),
            epoch_count: default_epoch_count(),
            failure_rate: false,
            excluded_sessions: Vec::new(),
            single_session_affixes: Vec::new(),
            markers: MarkerConfig::default(),
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            right: default_right_marker(),
            left: default_left_marker(),
            image: default_image_marker(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ExtractionConfig {
    /// Reject parameter combinations the stream processor cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.dt_cutoff_ms < self.residual_gap_ms {
            return Err(Error::Config(format!(
                "dt_cutoff_ms ({}) must not be smaller than residual_gap_ms ({})",
                self.dt_cutoff_ms, self.residual_gap_ms
            )));
        }
        if self.residual_gap_ms < 0 {
            return Err(Error::Config("residual_gap_ms must be >= 0".to_string()));
        }
        if self.epoch_ms <= 0 {
            return Err(Error::Config("epoch_ms must be > 0".to_string()));
        }
        let markers = [&self.markers.right, &self.markers.left, &self.markers.image];
        if markers.iter().any(|m| m.is_empty()) {
            return Err(Error::Config("interest-area markers must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Parse and validate a TOML config document
pub fn parse_config(content: &str, origin: &Path) -> Result<TomlConfig> {
    let config: TomlConfig = toml::from_str(content).map_err(|source| Error::Toml {
        path: origin.to_path_buf(),
        source,
    })?;
    config.extraction.validate()?;
    Ok(config)
}

/// Load configuration, falling back to built-in defaults
///
/// A missing file is not an error: a warning is logged and defaults are
/// returned. A file that exists but does not parse is an error.
pub fn load_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using built-in defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content, path)?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Config file resolution:
/// 1. Command-line argument (highest priority)
/// 2. `EYESCALAR_CONFIG` environment variable
/// 3. Platform config directory (`<config_dir>/eyescalar/config.toml`) if it exists
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("eyescalar").join("config.toml"))
        .filter(|p| p.exists())
}
