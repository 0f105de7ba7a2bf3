//! Host Builds
//!
//! Host versions, host descriptors and the local directory store of host
//! builds.

pub mod descriptor;
pub mod error;
pub mod local;
pub mod version;

pub use descriptor::HostDescriptor;
pub use error::{HostError, HostResult};
pub use local::{LocalHost, LocalHostStore};
pub use version::HostVersion;
