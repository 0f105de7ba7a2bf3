//! Plugin Error Types
//!
//! Errors raised while loading plugin descriptors and plugin artifacts.

use std::path::PathBuf;
use thiserror::Error;

use crate::resolver::ResolverError;

/// Result type for plugin loading
pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    /// No descriptor file in the plugin directory
    #[error("Plugin descriptor not found in {}", path.display())]
    DescriptorNotFound { path: PathBuf },

    /// The descriptor could not be parsed
    #[error("Descriptor parse error in {}: {message}", path.display())]
    DescriptorParseError { path: PathBuf, message: String },

    /// The descriptor parsed but is not usable
    #[error("Invalid plugin descriptor: {message}")]
    InvalidDescriptor { message: String },

    /// The plugin's classes could not be indexed
    #[error(transparent)]
    Classes(#[from] ResolverError),
}

impl PluginError {
    /// Create a descriptor parse error
    pub fn parse_error<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::DescriptorParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid descriptor error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidDescriptor { message: message.into() }
    }
}
