//! Host Descriptors
//!
//! One host build: its version, its classes, the plugins bundled with it and
//! the built-in modules it provides.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::version::HostVersion;
use crate::plugin::PluginDetails;
use crate::resolver::Resolver;

pub struct HostDescriptor {
    pub version: HostVersion,
    pub classes: Arc<dyn Resolver>,
    pub bundled_plugins: Vec<Arc<PluginDetails>>,
    pub modules: BTreeSet<String>,
}

impl HostDescriptor {
    pub fn new(version: HostVersion, classes: Arc<dyn Resolver>) -> Self {
        Self {
            version,
            classes,
            bundled_plugins: Vec::new(),
            modules: BTreeSet::new(),
        }
    }

    pub fn with_module<S: Into<String>>(mut self, module: S) -> Self {
        self.modules.insert(module.into());
        self
    }

    pub fn with_bundled_plugin(mut self, plugin: PluginDetails) -> Self {
        self.bundled_plugins.push(Arc::new(plugin));
        self
    }

    /// Whether `module` is built into the host itself
    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn find_bundled_plugin(&self, id: &str) -> Option<&Arc<PluginDetails>> {
        self.bundled_plugins.iter().find(|p| p.descriptor.id == id)
    }

    /// Bundled plugin declaring `module`
    pub fn find_plugin_by_module(&self, module: &str) -> Option<&Arc<PluginDetails>> {
        self.bundled_plugins
            .iter()
            .find(|p| p.descriptor.provides_module(module))
    }
}

impl fmt::Debug for HostDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bundled: Vec<_> = self.bundled_plugins.iter().map(|p| p.descriptor.coordinate()).collect();
        f.debug_struct("HostDescriptor")
            .field("version", &self.version)
            .field("classes", &self.classes.description())
            .field("bundled_plugins", &bundled)
            .field("modules", &self.modules)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginDescriptor;
    use crate::resolver::EmptyResolver;

    #[test]
    fn test_bundled_lookup() {
        let bundled = PluginDetails::new(
            PluginDescriptor::new("com.host.java", "146.1").with_module("com.host.modules.java"),
            Arc::new(EmptyResolver),
        );
        let host = HostDescriptor::new(HostVersion::parse("146.1").unwrap(), Arc::new(EmptyResolver))
            .with_module("com.host.modules.platform")
            .with_bundled_plugin(bundled);

        assert!(host.has_module("com.host.modules.platform"));
        assert!(!host.has_module("com.host.modules.java"));
        assert!(host.find_bundled_plugin("com.host.java").is_some());
        assert_eq!(
            host.find_plugin_by_module("com.host.modules.java").map(|p| p.id()),
            Some("com.host.java")
        );
        assert!(host.find_plugin_by_module("com.foo").is_none());
    }
}
