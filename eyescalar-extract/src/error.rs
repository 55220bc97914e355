//! Error types for eyescalar-extract
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Every fatal condition carries enough context (file, line, session) to locate
//! the offending input.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for eyescalar-extract
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration, overview or metadata lookup errors
    #[error(transparent)]
    Common(#[from] eyescalar_common::Error),

    /// Wrong field count or non-numeric field in a report line
    #[error("Malformed record in {} (line {line}): {reason}", file.display())]
    MalformedRecord {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    /// Ancillary report refers to a session without a cutoff table
    #[error("No cutoff data for session {session} referenced in {}; make sure sessions are labelled consistently in all report files", file.display())]
    InconsistentCutoff { session: String, file: PathBuf },

    /// Functioning side cannot be mapped onto left/right
    #[error("Functioning side {value} of session {session} not recognized")]
    UnrecognizedFunctioningSide { session: String, value: String },

    /// Report folder or file could not be read, or an output file written
    #[error("File I/O error on {}: {source}", file.display())]
    File {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output table could not be written
    #[error("Failed to write table {}: {source}", file.display())]
    Table {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// JSON export errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type using eyescalar-extract Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// I/O error tagged with the file it happened on
    pub fn file(path: &Path, source: std::io::Error) -> Self {
        Error::File {
            file: path.to_path_buf(),
            source,
        }
    }
}
