//! Verification Error Types

use thiserror::Error;

/// Result type for running the checker
pub type VerificationResult<T> = Result<T, VerificationError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerificationError {
    /// The run observed its cancellation token
    #[error("Verification was cancelled")]
    Cancelled,

    /// The filter definitions could not be loaded
    #[error("Invalid problem filter {source_name}: {message}")]
    InvalidFilter { source_name: String, message: String },
}

impl VerificationError {
    /// Create an invalid filter error
    pub fn invalid_filter<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::InvalidFilter {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
