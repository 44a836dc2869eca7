//! Unified error hierarchy for TrainLoad
//!
//! The analytics core itself never fails: missing inputs degrade to `None`.
//! These errors cover the edges where files are read or written.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all fallible TrainLoad operations
#[derive(Debug, Error)]
pub enum TrainLoadError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding errors (snapshots, reports, threshold history)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// TOML configuration could not be written
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Semantically invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A date string that should have been YYYY-MM-DD
    #[error("Invalid date: {value}")]
    InvalidDate { value: String },

    /// File missing at the expected location
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },
}

/// Result type alias for TrainLoad operations
pub type Result<T> = std::result::Result<T, TrainLoadError>;

impl TrainLoadError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TrainLoadError::FileNotFound { path } => {
                format!("Could not find file: {}", path.display())
            }
            TrainLoadError::Json(e) => {
                format!("Input is not valid JSON for this command: {}", e)
            }
            TrainLoadError::ConfigParse(e) => {
                format!("Configuration file has invalid TOML: {}", e)
            }
            TrainLoadError::InvalidDate { value } => {
                format!("Expected a date in YYYY-MM-DD format, got '{}'", value)
            }
            _ => self.to_string(),
        }
    }
}
