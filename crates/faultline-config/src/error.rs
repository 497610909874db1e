//! Errors from loading and checking a fault plan

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read fault plan at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse fault plan at {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid fault plan: {0}")]
    ValidationError(String),

    #[error("Cannot locate the faultline config directory: {0}")]
    XdgError(String),
}
