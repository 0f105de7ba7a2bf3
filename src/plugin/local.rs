//! Local Plugin Store
//!
//! Directory-backed storage of plugins laid out as
//! `<root>/<plugin id>/<version>/` with a descriptor file and a `classes/`
//! directory. The store provides [`PluginDetails`] to the plugin cache and
//! locks each loaded plugin directory against disk cleanup while it is in
//! use.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::descriptor::{PluginCoordinate, PluginDescriptor};
use super::details::PluginDetails;
use super::error::PluginError;
use crate::cache::{FileLockRegistry, ProvideResult, ResourceProvider};

#[derive(Debug, Clone)]
pub struct LocalPluginStore {
    root: PathBuf,
    locks: FileLockRegistry,
}

impl LocalPluginStore {
    pub fn new<P: Into<PathBuf>>(root: P, locks: FileLockRegistry) -> Self {
        Self {
            root: root.into(),
            locks,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn plugin_dir(&self, coordinate: &PluginCoordinate) -> PathBuf {
        self.root.join(&coordinate.id).join(&coordinate.version)
    }

    /// Descriptors of every loadable plugin in the store, sorted by coordinate
    pub fn descriptors(&self) -> Vec<Arc<PluginDescriptor>> {
        let mut descriptors = Vec::new();
        for id_dir in subdirectories(&self.root) {
            for version_dir in subdirectories(&id_dir) {
                match PluginDescriptor::load_from_dir(&version_dir) {
                    Ok(descriptor) => descriptors.push(Arc::new(descriptor)),
                    Err(e) => debug!("Skipping {}: {}", version_dir.display(), e),
                }
            }
        }
        descriptors.sort_by_key(|d| d.coordinate());
        descriptors
    }

    /// Versions stored for a plugin id, sorted
    pub fn versions(&self, id: &str) -> Vec<String> {
        let mut versions: Vec<String> = subdirectories(&self.root.join(id))
            .into_iter()
            .filter_map(|dir| dir.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        versions.sort();
        versions
    }
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

impl ResourceProvider<PluginCoordinate, PluginDetails> for LocalPluginStore {
    fn provide(&self, coordinate: &PluginCoordinate) -> ProvideResult<PluginDetails> {
        let dir = self.plugin_dir(coordinate);
        if !dir.is_dir() {
            return ProvideResult::NotFound(format!("plugin {} is not in {}", coordinate, self.root.display()));
        }

        let lock = self.locks.lock(&dir);
        match PluginDetails::load_from_dir(&dir, Some(lock)) {
            Ok(details) if details.descriptor.coordinate() == *coordinate => ProvideResult::Provided(details),
            Ok(details) => ProvideResult::Invalid(format!(
                "{} declares {} instead of {}",
                dir.display(),
                details.descriptor.coordinate(),
                coordinate
            )),
            Err(PluginError::Classes(e)) => ProvideResult::Failed(e.to_string()),
            Err(e) => ProvideResult::Invalid(e.to_string()),
        }
    }

    fn dispose(&self, coordinate: &PluginCoordinate, _details: &PluginDetails) {
        debug!("Evicted plugin {}", coordinate);
    }
}
