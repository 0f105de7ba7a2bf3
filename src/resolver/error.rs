//! Resolver Error Types

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for building resolvers
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Errors raised while indexing a class source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    /// The class root does not exist or is not a directory
    #[error("Class root is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// Reading the class source failed
    #[error("I/O error reading {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl ResolverError {
    /// Create an I/O error for a path
    pub fn io<P: AsRef<Path>>(path: P, error: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            message: error.to_string(),
        }
    }
}
