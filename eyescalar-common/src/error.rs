//! Common error types for eyescalar

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for eyescalar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the eyescalar crates
#[derive(Error, Debug)]
pub enum Error {
    /// File could not be read
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML file could not be parsed
    #[error("TOML parse error in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session id has no entry in the subject overview
    #[error("Failed to load data of subject {subject} (session {session})")]
    MissingMetadata { session: String, subject: String },
}
