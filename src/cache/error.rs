//! Cache Error Types

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for disk cache maintenance
pub type CleanupResult<T> = Result<T, CleanupError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CleanupError {
    /// The storage root is missing or not a directory
    #[error("Cache directory not found: {}", path.display())]
    MissingRoot { path: PathBuf },

    /// A filesystem operation failed
    #[error("I/O error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// The background cleanup task stopped abnormally
    #[error("Cleanup task failed: {message}")]
    TaskFailed { message: String },
}

impl CleanupError {
    /// Create an I/O error for a path
    pub fn io<P: AsRef<Path>>(path: P, error: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            message: error.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for CleanupError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::TaskFailed {
            message: error.to_string(),
        }
    }
}
