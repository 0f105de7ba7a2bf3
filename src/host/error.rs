//! Host Error Types

use std::path::PathBuf;
use thiserror::Error;

use crate::resolver::ResolverError;

/// Result type for host version and host descriptor operations
pub type HostResult<T> = Result<T, HostError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    /// A version string could not be parsed
    #[error("Invalid host version '{text}': {message}")]
    InvalidVersion { text: String, message: String },

    /// A host directory is missing its metadata
    #[error("Invalid host layout at {}: {message}", path.display())]
    InvalidLayout { path: PathBuf, message: String },

    /// The host's classes could not be indexed
    #[error(transparent)]
    Classes(#[from] ResolverError),
}

impl HostError {
    /// Create an invalid version error
    pub fn invalid_version<T: Into<String>, S: Into<String>>(text: T, message: S) -> Self {
        Self::InvalidVersion {
            text: text.into(),
            message: message.into(),
        }
    }

    /// Create an invalid layout error
    pub fn invalid_layout<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::InvalidLayout {
            path: path.into(),
            message: message.into(),
        }
    }
}
