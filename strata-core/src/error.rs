use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the scan pipeline and its ports.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tag error for {path}: {message}")]
    Tag { path: PathBuf, message: String },

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Cooperative early exit (operator cancel or process shutdown). Not a failure.
    #[error("Scan interrupted: {reason}")]
    Interrupted { reason: &'static str },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    /// Whether this is a cancel or shutdown rather than a failure.
    pub fn is_interruption(&self) -> bool {
        matches!(self, ScanError::Interrupted { .. })
    }
}

/// Result alias over [`ScanError`].
pub type Result<T> = std::result::Result<T, ScanError>;
