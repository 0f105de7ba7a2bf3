//! Plugin Details
//!
//! A loaded plugin: its descriptor plus the resolver over its classes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::descriptor::PluginDescriptor;
use super::error::PluginResult;
use crate::cache::FileLock;
use crate::resolver::{DirectoryResolver, EmptyResolver, Resolver};

/// Directory holding a plugin's compiled classes
pub const CLASSES_DIR: &str = "classes";

pub struct PluginDetails {
    pub descriptor: Arc<PluginDescriptor>,
    pub classes: Arc<dyn Resolver>,
    location: Option<PathBuf>,
    _lock: Option<FileLock>,
}

impl PluginDetails {
    pub fn new(descriptor: PluginDescriptor, classes: Arc<dyn Resolver>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            classes,
            location: None,
            _lock: None,
        }
    }

    /// Load `plugin.json`/`plugin.yaml` and `classes/` from a plugin directory
    pub fn load_from_dir<P: AsRef<Path>>(dir: P, lock: Option<FileLock>) -> PluginResult<Self> {
        let dir = dir.as_ref();
        let descriptor = PluginDescriptor::load_from_dir(dir)?;
        let classes_dir = dir.join(CLASSES_DIR);
        let classes: Arc<dyn Resolver> = if classes_dir.is_dir() {
            Arc::new(DirectoryResolver::open(&classes_dir)?)
        } else {
            Arc::new(EmptyResolver)
        };
        Ok(Self {
            descriptor: Arc::new(descriptor),
            classes,
            location: Some(dir.to_path_buf()),
            _lock: lock,
        })
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}

impl fmt::Debug for PluginDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDetails")
            .field("plugin", &self.descriptor.coordinate())
            .field("classes", &self.classes.description())
            .field("location", &self.location)
            .finish()
    }
}
