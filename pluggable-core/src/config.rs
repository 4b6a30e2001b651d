//! Registry configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::RegistryError;

/// Search path used when none is configured
pub const DEFAULT_SEARCH_PATH: &str = "plugins";

/// Configuration for one registry
///
/// Can be stored as TOML:
///
/// ```toml
/// search_path = "plugins"
/// except = "^Draft"
/// required_base = "PluginBase"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Root directory holding the plugin units
    #[serde(default = "default_search_path")]
    pub search_path: PathBuf,
    /// Canonical names matching this regular expression are skipped by bulk reloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub except: Option<String>,
    /// Contract every loaded plugin type must satisfy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_base: Option<String>,
}

fn default_search_path() -> PathBuf {
    PathBuf::from(DEFAULT_SEARCH_PATH)
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_PATH)
    }
}

impl RegistryConfig {
    /// Config searching `search_path` with no filter and no required base
    pub fn new(search_path: impl Into<PathBuf>) -> Self {
        Self {
            search_path: search_path.into(),
            except: None,
            required_base: None,
        }
    }

    /// Defaults for a named accessor: the search path is the accessor name
    pub fn for_accessor(accessor: &str) -> Self {
        Self::new(accessor)
    }

    /// Builder: skip canonical names matching `pattern` during bulk reloads
    pub fn except(mut self, pattern: impl Into<String>) -> Self {
        self.except = Some(pattern.into());
        self
    }

    /// Builder: require every plugin type to satisfy `contract`
    pub fn required_base(mut self, contract: impl Into<String>) -> Self {
        self.required_base = Some(contract.into());
        self
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| RegistryError::Config(e.to_string()))
    }

    /// Save config to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| RegistryError::Config(e.to_string()))?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = RegistryConfig::default();
        assert_eq!(config.search_path, PathBuf::from("plugins"));
        assert!(config.except.is_none());
        assert!(config.required_base.is_none());
    }

    #[test]
    fn test_config_for_accessor() {
        let config = RegistryConfig::for_accessor("filters");
        assert_eq!(config.search_path, PathBuf::from("filters"));
    }

    #[test]
    fn test_config_builders() {
        let config = RegistryConfig::new("/srv/plugins")
            .except("^Draft")
            .required_base("PluginBase");
        assert_eq!(config.except.as_deref(), Some("^Draft"));
        assert_eq!(config.required_base.as_deref(), Some("PluginBase"));
    }

    #[test]
    fn test_config_load_missing_file() {
        let result = RegistryConfig::load(Path::new("/nonexistent/path/registry.toml"));
        assert!(matches!(result, Err(RegistryError::Io(_))));
    }

    #[test]
    fn test_config_load_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "required_base = \"PluginBase\"\n").unwrap();

        let config = RegistryConfig::load(&path).unwrap();
        assert_eq!(config.search_path, PathBuf::from("plugins"));
        assert_eq!(config.required_base.as_deref(), Some("PluginBase"));
    }

    #[test]
    fn test_config_load_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "search_path = [").unwrap();

        let result = RegistryConfig::load(&path);
        assert!(matches!(result, Err(RegistryError::Config(_))));
    }

    #[test]
    fn test_config_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/registry.toml");

        let config = RegistryConfig::new("/srv/plugins").except("_$");
        config.save(&path).unwrap();

        let loaded = RegistryConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
