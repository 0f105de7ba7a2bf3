use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use toml::Value;

use crate::cli::size_parser::{parse_duration, parse_size};

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "PLUGIN_VERIFIER_CONFIG";

const VERIFIER_SECTION: &str = "verifier";
const CACHE_SECTION: &str = "cache";

/// Settings for a verification run
#[derive(Debug, Clone, PartialEq)]
pub struct VerifierConfig {
    pub workers: usize,
    pub plugin_cache_capacity: usize,
    pub host_cache_capacity: usize,
    pub disk_quota_bytes: u64,
    /// Root of downloaded plugins and hosts; `None` disables disk cleanup
    pub cache_dir: Option<PathBuf>,
    pub cleanup_interval: Duration,
    pub external_prefixes: Vec<String>,
    /// `plugin-id:description` regex pairs of problems to ignore
    pub ignored_problems: Vec<String>,
    pub documented_problems: Option<PathBuf>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            plugin_cache_capacity: 16,
            host_cache_capacity: 4,
            disk_quota_bytes: 5 * 1024 * 1024 * 1024,
            cache_dir: None,
            cleanup_interval: Duration::from_secs(600),
            external_prefixes: Vec::new(),
            ignored_problems: Vec::new(),
            documented_problems: None,
        }
    }
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.plugin_cache_capacity == 0 || self.host_cache_capacity == 0 {
            anyhow::bail!("cache capacities must be at least 1");
        }
        if self.cleanup_interval.is_zero() {
            anyhow::bail!("cleanup-interval must be positive");
        }
        Ok(())
    }
}

pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load the first configuration file found in the discovery order
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");
        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                return Self::load_from_file(path);
            }
        }
        info!("No configuration file found, using defaults");
        Ok(Self::from_config(Configuration::new()))
    }

    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config =
            parse_toml_config(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    pub fn config_file_path(&self) -> Option<&PathBuf> {
        self.config_file_path.as_ref()
    }

    /// Value lookup: selected section, then `section`, then `base`
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }
        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }
        self.config.get("base").and_then(|s| s.get(key))
    }

    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>> {
        self.get_value(section, key)
            .map(|value| {
                value
                    .parse::<usize>()
                    .with_context(|| format!("Invalid {} value in config: {}", key, value))
            })
            .transpose()
    }

    /// String list stored as a TOML array; a plain string is a one-item list
    fn get_list(&self, section: &str, key: &str) -> Result<Vec<String>> {
        let Some(value) = self.get_value(section, key) else {
            return Ok(Vec::new());
        };
        if !value.trim_start().starts_with('[') {
            return Ok(vec![value.clone()]);
        }
        let mut table: toml::Table = format!("list = {}", value)
            .parse()
            .with_context(|| format!("Invalid {} value in config: {}", key, value))?;
        match table.remove("list") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(anyhow::anyhow!("Invalid entry in {}: {}", key, other)),
                })
                .collect(),
            _ => Err(anyhow::anyhow!("Invalid {} value in config: {}", key, value)),
        }
    }

    pub fn get_verifier_config(&self) -> Result<VerifierConfig> {
        let mut config = VerifierConfig::default();

        if let Some(workers) = self.get_usize(VERIFIER_SECTION, "workers")? {
            config.workers = workers;
        }
        config.external_prefixes = self.get_list(VERIFIER_SECTION, "external-prefixes")?;
        config.ignored_problems = self.get_list(VERIFIER_SECTION, "ignored-problems")?;
        config.documented_problems = self.get_path(VERIFIER_SECTION, "documented-problems");

        if let Some(capacity) = self.get_usize(CACHE_SECTION, "plugin-capacity")? {
            config.plugin_cache_capacity = capacity;
        }
        if let Some(capacity) = self.get_usize(CACHE_SECTION, "host-capacity")? {
            config.host_cache_capacity = capacity;
        }
        if let Some(quota) = self.get_value(CACHE_SECTION, "disk-quota") {
            config.disk_quota_bytes =
                parse_size(quota).with_context(|| format!("Invalid disk-quota value in config: {}", quota))?;
        }
        if let Some(interval) = self.get_value(CACHE_SECTION, "cleanup-interval") {
            config.cleanup_interval = parse_duration(interval)
                .with_context(|| format!("Invalid cleanup-interval value in config: {}", interval))?;
        }
        config.cache_dir = self.get_path(CACHE_SECTION, "directory");

        config.validate().context("Verifier configuration validation failed")?;
        Ok(config)
    }
}

/// Configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(env_path) = env::var(CONFIG_ENV) {
        paths.push(PathBuf::from(env_path));
    }
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("plugin-verifier").join("config.toml"));
    }
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".plugin-verifier.toml"));
    }
    paths.push(PathBuf::from("./.plugin-verifier.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

fn parse_toml_config(content: &str) -> Result<Configuration> {
    let table: toml::Table = content.parse().context("Failed to parse TOML content")?;
    let mut config = Configuration::new();
    flatten_toml_table(&table, String::new(), &mut config);
    Ok(config)
}

/// Flatten nested tables into `section.subsection` keys
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) if subtable.values().all(|v| !v.is_table()) => {
                let section = config.entry(section_name).or_default();
                for (subkey, subvalue) in subtable {
                    section.insert(subkey.clone(), toml_value_to_string(subvalue));
                }
            }
            Value::Table(subtable) => flatten_toml_table(subtable, section_name, config),
            _ => {
                config
                    .entry(if prefix.is_empty() { "base".to_string() } else { prefix.clone() })
                    .or_default()
                    .insert(key.clone(), toml_value_to_string(value));
            }
        }
    }
}

fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn manager(toml_content: &str) -> ConfigManager {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(&temp_file, toml_content).unwrap();
        ConfigManager::load_from_file(temp_file.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_parse_sections() {
        let config = parse_toml_config(
            r#"
log-level = "debug"

[base]
quiet = true

[verifier.ci]
workers = 2
"#,
        )
        .unwrap();

        assert_eq!(config["base"]["quiet"], "true");
        assert_eq!(config["base"]["log-level"], "debug");
        assert_eq!(config["verifier.ci"]["workers"], "2");
    }

    #[test]
    fn test_section_fallback_and_selection() {
        let mut manager = manager(
            r#"
[base]
workers = 3

[verifier]
plugin-capacity = 8

[ci]
workers = 1
"#,
        );
        assert_eq!(manager.get_value("verifier", "workers").unwrap(), "3");
        assert_eq!(manager.get_value("verifier", "plugin-capacity").unwrap(), "8");

        manager.select_section("ci".to_string());
        assert_eq!(manager.get_value("verifier", "workers").unwrap(), "1");
        assert!(manager.config_file_path().is_some());
    }

    #[test]
    fn test_typed_getters() {
        let manager = manager(
            r#"
[base]
color = false
log-level = "warn"
log-file = "/tmp/verifier.log"
broken = "maybe"
"#,
        );
        assert_eq!(manager.get_bool("base", "color").unwrap(), Some(false));
        assert!(manager.get_bool("base", "broken").is_err());
        assert_eq!(manager.get_log_level("base", "log-level").unwrap(), Some(log::LevelFilter::Warn));
        assert_eq!(manager.get_path("base", "log-file"), Some(PathBuf::from("/tmp/verifier.log")));
        assert!(manager.get_path("base", "missing").is_none());
    }

    #[test]
    fn test_default_verifier_config() {
        let config = ConfigManager::from_config(Configuration::new()).get_verifier_config().unwrap();
        assert_eq!(config, VerifierConfig::default());
        assert!(config.workers >= 1);
    }

    #[test]
    fn test_verifier_config_from_toml() {
        let config = manager(
            r#"
[verifier]
workers = 6
external-prefixes = ["org.jetbrains.kotlin", "com/external"]
ignored-problems = ["com.example:.*removed.*"]

[cache]
plugin-capacity = 32
host-capacity = 2
disk-quota = "2GB"
cleanup-interval = "5m"
directory = "/var/cache/verifier"
"#,
        )
        .get_verifier_config()
        .unwrap();

        assert_eq!(config.workers, 6);
        assert_eq!(config.external_prefixes, vec!["org.jetbrains.kotlin", "com/external"]);
        assert_eq!(config.ignored_problems, vec!["com.example:.*removed.*"]);
        assert_eq!(config.plugin_cache_capacity, 32);
        assert_eq!(config.host_cache_capacity, 2);
        assert_eq!(config.disk_quota_bytes, 2 * 1024 * 1024 * 1024);
        assert_eq!(config.cleanup_interval, Duration::from_secs(300));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/verifier")));
    }

    #[test]
    fn test_invalid_verifier_config() {
        assert!(manager("[cache]\ndisk-quota = \"lots\"\n").get_verifier_config().is_err());
        assert!(manager("[verifier]\nworkers = 0\n").get_verifier_config().is_err());
        assert!(manager("[verifier]\nworkers = \"many\"\n").get_verifier_config().is_err());
    }
}
