//! Plugin Repositories
//!
//! Where dependencies are looked up when the host does not bundle them. A
//! repository only knows descriptors; the plugins themselves are loaded
//! through the plugin cache.

use log::debug;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::plugin::{LocalPluginStore, PluginCoordinate, PluginDescriptor};

/// A catalogue of available plugins
pub trait PluginRepository: Send + Sync + fmt::Debug {
    /// Newest version of the plugin with `id`
    fn last_version(&self, id: &str) -> Option<PluginCoordinate>;

    /// Newest version of a plugin declaring `module`
    fn plugin_by_module(&self, module: &str) -> Option<PluginCoordinate>;

    /// Every stored version of `id`, oldest first
    fn all_versions(&self, id: &str) -> Vec<PluginCoordinate>;
}

/// Repository over descriptors held in memory
#[derive(Debug, Default)]
pub struct InMemoryPluginRepository {
    descriptors: RwLock<Vec<Arc<PluginDescriptor>>>,
}

impl InMemoryPluginRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every plugin found in a local store
    pub fn from_store(store: &LocalPluginStore) -> Self {
        let repository = Self::new();
        for descriptor in store.descriptors() {
            repository.add(descriptor);
        }
        debug!(
            "Indexed {} plugins from {}",
            repository.len(),
            store.root().display()
        );
        repository
    }

    pub fn add(&self, descriptor: Arc<PluginDescriptor>) {
        let mut descriptors = self.descriptors.write();
        descriptors.retain(|d| d.coordinate() != descriptor.coordinate());
        descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }

    fn newest<F>(&self, predicate: F) -> Option<PluginCoordinate>
    where
        F: Fn(&PluginDescriptor) -> bool,
    {
        self.descriptors
            .read()
            .iter()
            .filter(|d| predicate(d))
            .max_by(|a, b| compare_versions(&a.version, &b.version))
            .map(|d| d.coordinate())
    }
}

impl PluginRepository for InMemoryPluginRepository {
    fn last_version(&self, id: &str) -> Option<PluginCoordinate> {
        self.newest(|d| d.id == id)
    }

    fn plugin_by_module(&self, module: &str) -> Option<PluginCoordinate> {
        self.newest(|d| d.provides_module(module))
    }

    fn all_versions(&self, id: &str) -> Vec<PluginCoordinate> {
        let mut versions: Vec<Arc<PluginDescriptor>> =
            self.descriptors.read().iter().filter(|d| d.id == id).cloned().collect();
        versions.sort_by(|a, b| compare_versions(&a.version, &b.version));
        versions.iter().map(|d| d.coordinate()).collect()
    }
}

/// Compare dotted plugin versions, numeric parts numerically.
///
/// `1.10` is newer than `1.9`, and `1.0` is newer than `1.0-beta`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts = |v: &str| -> Vec<String> { v.split(['.', '-']).map(str::to_string).collect() };
    let (left, right) = (parts(a), parts(b));
    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => l.cmp(r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    // a release is newer than its qualified pre-releases
    match left.len().cmp(&right.len()) {
        Ordering::Less if right[left.len()].parse::<u64>().is_err() => Ordering::Greater,
        Ordering::Greater if left[right.len()].parse::<u64>().is_err() => Ordering::Less,
        other => other,
    }
}
