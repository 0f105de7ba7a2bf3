//! Plugins
//!
//! Plugin descriptors, loaded plugin details and the local directory store
//! that supplies them to the plugin cache.

pub mod descriptor;
pub mod details;
pub mod error;
pub mod local;

pub use descriptor::{PluginCoordinate, PluginDependency, PluginDescriptor};
pub use details::PluginDetails;
pub use error::{PluginError, PluginResult};
pub use local::LocalPluginStore;
