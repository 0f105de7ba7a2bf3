//! Dependency Finders
//!
//! Strategies for turning a declared dependency into a loaded plugin: the
//! plugins bundled with the host, a plugin repository backed by the plugin
//! cache, and a composite trying several finders in order.

use log::debug;
use std::fmt;
use std::sync::Arc;

use super::repository::PluginRepository;
use crate::cache::{CacheResult, ResourceCache, ScopedHandle};
use crate::host::HostDescriptor;
use crate::plugin::{PluginCoordinate, PluginDependency, PluginDetails};

/// Reason recorded for a dependency no finder could supply
pub const NOT_FOUND: &str = "not found";

/// Outcome of looking up one dependency
pub enum DependencyLookup {
    /// Loaded through the plugin cache; the handle keeps it alive
    DetailsProvided(ScopedHandle<PluginCoordinate, PluginDetails>),
    /// Already in memory, typically bundled with the host
    FoundPlugin(Arc<PluginDetails>),
    NotFound(String),
}

impl DependencyLookup {
    pub fn details(&self) -> Option<Arc<PluginDetails>> {
        match self {
            DependencyLookup::DetailsProvided(handle) => Some(handle.resource()),
            DependencyLookup::FoundPlugin(details) => Some(Arc::clone(details)),
            DependencyLookup::NotFound(_) => None,
        }
    }
}

impl fmt::Debug for DependencyLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyLookup::DetailsProvided(handle) => write!(f, "DetailsProvided({})", handle.key()),
            DependencyLookup::FoundPlugin(details) => write!(f, "FoundPlugin({})", details.descriptor.coordinate()),
            DependencyLookup::NotFound(reason) => write!(f, "NotFound({})", reason),
        }
    }
}

pub trait DependencyFinder: Send + Sync {
    fn find(&self, dependency: &PluginDependency) -> DependencyLookup;
}

/// Finds plugins bundled with a host build
#[derive(Debug, Clone)]
pub struct BundledPluginFinder {
    bundled: Vec<Arc<PluginDetails>>,
}

impl BundledPluginFinder {
    pub fn new(host: &HostDescriptor) -> Self {
        Self {
            bundled: host.bundled_plugins.clone(),
        }
    }
}

impl DependencyFinder for BundledPluginFinder {
    fn find(&self, dependency: &PluginDependency) -> DependencyLookup {
        let found = if dependency.is_module {
            self.bundled.iter().find(|p| p.descriptor.provides_module(&dependency.id))
        } else {
            self.bundled.iter().find(|p| p.id() == dependency.id)
        };
        match found {
            Some(details) => DependencyLookup::FoundPlugin(Arc::clone(details)),
            None => DependencyLookup::NotFound(format!("{} is not bundled with the host", dependency)),
        }
    }
}

/// Finds the newest repository version of a dependency and loads it through
/// the plugin cache
pub struct RepositoryDependencyFinder {
    repository: Arc<dyn PluginRepository>,
    cache: ResourceCache<PluginCoordinate, PluginDetails>,
}

impl RepositoryDependencyFinder {
    pub fn new(repository: Arc<dyn PluginRepository>, cache: ResourceCache<PluginCoordinate, PluginDetails>) -> Self {
        Self { repository, cache }
    }
}

impl DependencyFinder for RepositoryDependencyFinder {
    fn find(&self, dependency: &PluginDependency) -> DependencyLookup {
        let coordinate = if dependency.is_module {
            self.repository.plugin_by_module(&dependency.id)
        } else {
            self.repository.last_version(&dependency.id)
        };
        let Some(coordinate) = coordinate else {
            return DependencyLookup::NotFound(format!("{} is not in {:?}", dependency, self.repository));
        };
        match self.cache.acquire(&coordinate) {
            CacheResult::Found(handle) => DependencyLookup::DetailsProvided(handle),
            CacheResult::NotFound(reason) => DependencyLookup::NotFound(reason),
            CacheResult::Invalid(reason) => DependencyLookup::NotFound(format!("{} is invalid: {}", coordinate, reason)),
            CacheResult::Failed(reason) => {
                DependencyLookup::NotFound(format!("{} failed to load: {}", coordinate, reason))
            }
        }
    }
}

/// Tries each finder in order; the first hit wins
#[derive(Default)]
pub struct CompositeDependencyFinder {
    finders: Vec<Arc<dyn DependencyFinder>>,
}

impl CompositeDependencyFinder {
    pub fn new(finders: Vec<Arc<dyn DependencyFinder>>) -> Self {
        Self { finders }
    }

    pub fn with_finder(mut self, finder: Arc<dyn DependencyFinder>) -> Self {
        self.finders.push(finder);
        self
    }
}

impl DependencyFinder for CompositeDependencyFinder {
    fn find(&self, dependency: &PluginDependency) -> DependencyLookup {
        for finder in &self.finders {
            match finder.find(dependency) {
                DependencyLookup::NotFound(reason) => debug!("{}: {}", dependency, reason),
                found @ (DependencyLookup::DetailsProvided(_) | DependencyLookup::FoundPlugin(_)) => return found,
            }
        }
        DependencyLookup::NotFound(NOT_FOUND.to_string())
    }
}
