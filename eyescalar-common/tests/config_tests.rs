//! Tests for configuration loading and graceful degradation
//!
//! Covers:
//! - Missing TOML files fall back to compiled defaults
//! - Config file resolution priority (CLI > environment > platform dir)
//! - Invalid parameter combinations are rejected with the file path
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate EYESCALAR_CONFIG are marked with #[serial].

use eyescalar_common::config::{load_config, resolve_config_path, CONFIG_ENV_VAR};
use eyescalar_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Log sink shared between a test subscriber and the test body
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("does-not-exist.toml");

    let config = load_config(Some(&missing)).unwrap();
    assert_eq!(config.extraction.dt_cutoff_ms, 200);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_missing_config_file_logs_warning() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("does-not-exist.toml");

    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, || load_config(Some(&missing)).unwrap());

    let text = log.text();
    assert!(text.contains("WARN"), "captured: {text}");
    assert!(text.contains("does-not-exist.toml"));
    assert!(text.contains("not found"));
}

#[test]
fn test_no_config_path_uses_defaults() {
    let config = load_config(None).unwrap();
    assert_eq!(config.extraction.epoch_count, 5);
    assert!(config.extraction.excluded_sessions.is_empty());
}

#[test]
fn test_full_config_file_is_loaded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(
        &path,
        r#"
[extraction]
dt_cutoff_ms = 300
failure_rate = true
excluded_sessions = ["35.3", "41.1"]
single_session_affixes = ["msc_4_"]

[extraction.markers]
right = "DiscR"
left = "DiscL"

[logging]
level = "debug"

[paths]
reports = "/data/reports"
"#,
    )
    .unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.extraction.dt_cutoff_ms, 300);
    assert!(config.extraction.failure_rate);
    assert_eq!(config.extraction.excluded_sessions, vec!["35.3", "41.1"]);
    assert_eq!(config.extraction.single_session_affixes, vec!["msc_4_"]);
    assert_eq!(config.extraction.markers.right, "DiscR");
    assert_eq!(config.extraction.markers.image, "image");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.paths.reports, Some(PathBuf::from("/data/reports")));
    assert!(config.paths.output.is_none());
}

#[test]
fn test_invalid_epoch_length_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "[extraction]\nepoch_ms = 0\n").unwrap();

    let result = load_config(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_path_wins_over_environment() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/from-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_path_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_empty_environment_value_is_ignored() {
    env::set_var(CONFIG_ENV_VAR, "");

    let resolved = resolve_config_path(None);
    // Falls through to the platform config dir, which only counts if present
    if let Some(path) = resolved {
        assert!(path.exists());
        assert!(path.ends_with("eyescalar/config.toml"));
    }

    env::remove_var(CONFIG_ENV_VAR);
}
