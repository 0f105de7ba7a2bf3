//! Dependency Resolution Error Types

use thiserror::Error;

/// Result type for dependency graph construction
pub type DependencyResult<T> = Result<T, DependencyError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DependencyError {
    /// The build observed its cancellation token
    #[error("Dependency resolution was cancelled")]
    Cancelled,
}
