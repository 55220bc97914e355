//! # eyescalar Common Library
//!
//! Shared code for the eyescalar tools including:
//! - Error types
//! - Bootstrap configuration loading (TOML)
//! - Subject metadata (overview) lookup
//! - Session label and session name parsing

pub mod config;
pub mod error;
pub mod metadata;

pub use error::{Error, Result};
pub use metadata::{FunctioningSide, Overview, SessionParams};
