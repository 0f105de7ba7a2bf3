//! Local Host Store
//!
//! Host builds stored as `<root>/<version>/` with an optional `host.json`
//! (product code and built-in modules), a `classes/` directory and bundled
//! plugins under `plugins/<name>/`.

use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::descriptor::HostDescriptor;
use super::error::{HostError, HostResult};
use super::version::HostVersion;
use crate::cache::{FileLock, FileLockRegistry, ProvideResult, ResourceProvider};
use crate::plugin::details::CLASSES_DIR;
use crate::plugin::PluginDetails;
use crate::resolver::{DirectoryResolver, Resolver};

pub const HOST_METADATA_FILE: &str = "host.json";
pub const BUNDLED_PLUGINS_DIR: &str = "plugins";

#[derive(Debug, Default, Deserialize)]
struct HostMetadata {
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    modules: BTreeSet<String>,
}

/// A loaded host plus the lock keeping its directory out of disk cleanup
pub struct LocalHost {
    pub descriptor: HostDescriptor,
    _lock: FileLock,
}

impl std::ops::Deref for LocalHost {
    type Target = HostDescriptor;

    fn deref(&self) -> &HostDescriptor {
        &self.descriptor
    }
}

#[derive(Debug, Clone)]
pub struct LocalHostStore {
    root: PathBuf,
    locks: FileLockRegistry,
}

impl LocalHostStore {
    pub fn new<P: Into<PathBuf>>(root: P, locks: FileLockRegistry) -> Self {
        Self {
            root: root.into(),
            locks,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host versions present in the store, ascending
    pub fn available_versions(&self) -> Vec<HostVersion> {
        let mut versions: Vec<HostVersion> = self
            .version_dirs()
            .into_iter()
            .map(|(version, _)| version)
            .collect();
        versions.sort();
        versions
    }

    fn version_dirs(&self) -> Vec<(HostVersion, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                match HostVersion::parse(name) {
                    Ok(version) => Some((version, path.clone())),
                    Err(e) => {
                        debug!("Ignoring host directory {}: {}", path.display(), e);
                        None
                    }
                }
            })
            .collect()
    }

    fn load(&self, version: &HostVersion, dir: &Path) -> HostResult<HostDescriptor> {
        let metadata_path = dir.join(HOST_METADATA_FILE);
        let metadata: HostMetadata = if metadata_path.is_file() {
            let content = fs::read_to_string(&metadata_path)
                .map_err(|e| HostError::invalid_layout(&metadata_path, e.to_string()))?;
            serde_json::from_str(&content).map_err(|e| HostError::invalid_layout(&metadata_path, e.to_string()))?
        } else {
            HostMetadata::default()
        };

        let classes_dir = dir.join(CLASSES_DIR);
        if !classes_dir.is_dir() {
            return Err(HostError::invalid_layout(dir, "missing classes directory"));
        }
        let classes: Arc<dyn Resolver> = Arc::new(DirectoryResolver::open(&classes_dir)?);

        let mut version = version.clone();
        if let Some(product) = metadata.product {
            version = version.with_product(product);
        }
        let mut descriptor = HostDescriptor::new(version, classes);
        descriptor.modules = metadata.modules;

        let plugins_dir = dir.join(BUNDLED_PLUGINS_DIR);
        if let Ok(entries) = fs::read_dir(&plugins_dir) {
            let mut plugin_dirs: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            plugin_dirs.sort();
            for plugin_dir in plugin_dirs {
                match PluginDetails::load_from_dir(&plugin_dir, None) {
                    Ok(plugin) => descriptor.bundled_plugins.push(Arc::new(plugin)),
                    Err(e) => warn!("Skipping bundled plugin {}: {}", plugin_dir.display(), e),
                }
            }
        }

        Ok(descriptor)
    }
}

impl ResourceProvider<HostVersion, LocalHost> for LocalHostStore {
    fn provide(&self, version: &HostVersion) -> ProvideResult<LocalHost> {
        let Some((_, dir)) = self.version_dirs().into_iter().find(|(v, _)| v == version) else {
            return ProvideResult::NotFound(format!("host {} is not in {}", version, self.root.display()));
        };

        let lock = self.locks.lock(&dir);
        match self.load(version, &dir) {
            Ok(descriptor) => {
                debug!(
                    "Loaded host {} with {} bundled plugins",
                    descriptor.version,
                    descriptor.bundled_plugins.len()
                );
                ProvideResult::Provided(LocalHost { descriptor, _lock: lock })
            }
            Err(e @ HostError::Classes(_)) => ProvideResult::Failed(e.to_string()),
            Err(e) => ProvideResult::Invalid(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{write_class, ClassFile};
    use tempfile::TempDir;

    fn store_host(root: &Path, version: &str, metadata: Option<&str>) {
        let dir = root.join(version);
        fs::create_dir_all(dir.join("classes/org/host")).unwrap();
        fs::write(
            dir.join("classes/org/host/Api.class"),
            write_class(&ClassFile::new("org/host/Api")),
        )
        .unwrap();
        if let Some(metadata) = metadata {
            fs::write(dir.join(HOST_METADATA_FILE), metadata).unwrap();
        }
        let bundled = dir.join("plugins/java");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(
            bundled.join("plugin.json"),
            r#"{"id": "com.host.java", "version": "1", "modules": ["com.host.modules.java"]}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_available_versions_sorted() {
        let temp = TempDir::new().unwrap();
        store_host(temp.path(), "146.10", None);
        store_host(temp.path(), "146.9", None);
        store_host(temp.path(), "145.1", None);
        fs::create_dir_all(temp.path().join("not-a-version")).unwrap();

        let store = LocalHostStore::new(temp.path(), FileLockRegistry::new());
        let versions: Vec<String> = store.available_versions().iter().map(|v| v.to_string()).collect();
        assert_eq!(versions, vec!["145.1", "146.9", "146.10"]);
    }

    #[test]
    fn test_provides_host_with_metadata() {
        let temp = TempDir::new().unwrap();
        store_host(
            temp.path(),
            "146.1",
            Some(r#"{"product": "IU", "modules": ["com.host.modules.platform"]}"#),
        );
        let locks = FileLockRegistry::new();
        let store = LocalHostStore::new(temp.path(), locks.clone());

        let host = match store.provide(&HostVersion::parse("146.1").unwrap()) {
            ProvideResult::Provided(host) => host,
            ProvideResult::NotFound(reason) | ProvideResult::Invalid(reason) | ProvideResult::Failed(reason) => {
                panic!("expected host: {}", reason)
            }
        };
        assert_eq!(host.version.to_string(), "IU-146.1");
        assert!(host.has_module("com.host.modules.platform"));
        assert!(host.classes.contains("org/host/Api"));
        assert!(host.find_plugin_by_module("com.host.modules.java").is_some());
        assert!(locks.is_locked(temp.path().join("146.1")));
    }

    #[test]
    fn test_missing_host() {
        let temp = TempDir::new().unwrap();
        let store = LocalHostStore::new(temp.path(), FileLockRegistry::new());
        assert!(matches!(
            store.provide(&HostVersion::parse("1.0").unwrap()),
            ProvideResult::NotFound(_)
        ));
    }
}
