//! Plugin Descriptors
//!
//! Immutable plugin metadata: identity, declared dependencies, supported host
//! range, extensions and the modules the plugin provides. Descriptors are read
//! from `plugin.json` or `plugin.yaml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::error::{PluginError, PluginResult};
use crate::host::HostVersion;

/// Descriptor file names probed in order
pub const DESCRIPTOR_FILES: &[&str] = &["plugin.json", "plugin.yaml", "plugin.yml"];

/// A declared dependency on another plugin or module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginDependency {
    pub id: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, rename = "module")]
    pub is_module: bool,
    /// Extra configuration file the dependency contributes, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
}

impl PluginDependency {
    pub fn plugin<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            optional: false,
            is_module: false,
            config_file: None,
        }
    }

    pub fn module<S: Into<String>>(id: S) -> Self {
        Self {
            is_module: true,
            ..Self::plugin(id)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl fmt::Display for PluginDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_module { "module" } else { "plugin" };
        write!(f, "{} {}", kind, self.id)?;
        if self.optional {
            write!(f, " (optional)")?;
        }
        Ok(())
    }
}

/// Plugin identity: id plus version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginCoordinate {
    pub id: String,
    pub version: String,
}

impl PluginCoordinate {
    pub fn new<I: Into<String>, V: Into<String>>(id: I, version: V) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PluginCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<PluginDependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<HostVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<HostVersion>,
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Module ids this plugin provides
    #[serde(default)]
    pub modules: Vec<String>,
}

impl PluginDescriptor {
    pub fn new<I: Into<String>, V: Into<String>>(id: I, version: V) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            dependencies: Vec::new(),
            since: None,
            until: None,
            extensions: Vec::new(),
            modules: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: PluginDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_range(mut self, since: Option<HostVersion>, until: Option<HostVersion>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn with_module<S: Into<String>>(mut self, module: S) -> Self {
        self.modules.push(module.into());
        self
    }

    pub fn coordinate(&self) -> PluginCoordinate {
        PluginCoordinate::new(&self.id, &self.version)
    }

    pub fn provides_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }

    /// Whether `host` lies inside the declared since/until range
    pub fn is_compatible_with(&self, host: &HostVersion) -> bool {
        host.is_within(self.since.as_ref(), self.until.as_ref())
    }

    /// Structural checks beyond what deserialization enforces
    pub fn validate(&self) -> PluginResult<()> {
        if self.id.trim().is_empty() {
            return Err(PluginError::invalid("plugin id is empty"));
        }
        if self.version.trim().is_empty() {
            return Err(PluginError::invalid(format!("plugin {} has an empty version", self.id)));
        }
        if let (Some(since), Some(until)) = (&self.since, &self.until) {
            if since > until {
                return Err(PluginError::invalid(format!(
                    "plugin {} has since {} after until {}",
                    self.id, since, until
                )));
            }
        }
        Ok(())
    }

    /// Read the descriptor from a plugin directory
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> PluginResult<Self> {
        let dir = dir.as_ref();
        let path = DESCRIPTOR_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| PluginError::DescriptorNotFound { path: dir.to_path_buf() })?;

        let content = fs::read_to_string(&path).map_err(|e| PluginError::parse_error(&path, e.to_string()))?;
        let descriptor: PluginDescriptor = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| PluginError::parse_error(&path, e.to_string()))?
        } else {
            serde_yaml::from_str(&content).map_err(|e| PluginError::parse_error(&path, e.to_string()))?
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}
