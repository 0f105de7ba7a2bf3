//! Resource Caching
//!
//! The bounded reference-counted [`ResourceCache`] shared by verification
//! tasks, plus disk quota enforcement for the on-disk storage behind it.

pub mod disk_cleanup;
pub mod error;
pub mod file_lock;
pub mod resource_cache;
pub mod statistics;

pub use disk_cleanup::{CleanupReport, DiskSpaceCleaner};
pub use error::{CleanupError, CleanupResult};
pub use file_lock::{FileLock, FileLockRegistry};
pub use resource_cache::{CacheResult, ProvideResult, ResourceCache, ResourceProvider, ScopedHandle};
pub use statistics::{CacheStatistics, CacheStats};

#[cfg(test)]
mod tests;
