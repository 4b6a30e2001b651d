//! PluginContext - a plugin's view of the registry that loaded it

use crate::error::PluginError;
use crate::types::CallResults;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

// ─── Dispatch Trait ──────────────────────────────────────────────────

/// The registry-facing side of a plugin's back-reference.
///
/// A registry implements this so the plugins it owns can reach their
/// siblings without holding the registry alive. The concrete implementation
/// lives in pluggable-core.
///
/// # Example
///
/// ```ignore
/// fn invoke(&self, capability: &str, args: &[Value], ctx: &PluginContext) -> Result<Value, PluginError> {
///     let registry = ctx.registry().ok_or_else(|| PluginError::custom("registry gone"))?;
///     let greetings = registry.call("greet", args)?;
///     Ok(Value::from(greetings.len()))
/// }
/// ```
pub trait Dispatch: Send + Sync {
    /// Canonical names of every loaded plugin, in load order
    fn plugin_names(&self) -> Vec<String>;

    /// Fan a capability out to every loaded plugin that answers to it
    fn call(&self, capability: &str, args: &[Value]) -> Result<CallResults, PluginError>;
}

/// Plugin's interface to the registry that loaded it.
///
/// Built by the registry after the plugin has been instantiated and passed to
/// every hook and capability invocation. It provides:
/// - The plugin's canonical name and the unit file it came from
/// - Read-only settings shipped alongside the unit
/// - Logging utilities
/// - A weak back-reference to the owning registry
pub struct PluginContext {
    plugin_name: String,
    unit_path: PathBuf,
    config: PluginConfig,
    registry: Option<Weak<dyn Dispatch>>,
}

/// Plugin settings - key-value table backed by TOML
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    values: HashMap<String, toml::Value>,
}

impl PluginContext {
    /// Create a new plugin context
    pub fn new(plugin_name: impl Into<String>, unit_path: impl Into<PathBuf>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            unit_path: unit_path.into(),
            config: PluginConfig::new(),
            registry: None,
        }
    }

    /// Builder: attach the unit's settings
    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder: attach the back-reference to the owning registry
    pub fn with_registry(mut self, registry: Weak<dyn Dispatch>) -> Self {
        self.registry = Some(registry);
        self
    }

    // ─── Identity & Configuration ────────────────────────────────────

    /// Get the plugin's canonical name
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Get the path of the unit file this plugin was loaded from
    pub fn unit_path(&self) -> &Path {
        &self.unit_path
    }

    /// Read a configuration value
    ///
    /// # Example
    /// ```ignore
    /// let greeting: Option<String> = ctx.config_get("greeting");
    /// ```
    pub fn config_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.get(key)
    }

    /// Get the full settings table
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    // ─── Registry ────────────────────────────────────────────────────

    /// Get the owning registry, if it is still alive
    ///
    /// Returns `None` when the context was built outside a registry or the
    /// registry has been dropped.
    pub fn registry(&self) -> Option<Arc<dyn Dispatch>> {
        self.registry.as_ref().and_then(Weak::upgrade)
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (automatically prefixed with plugin name)
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin_name, "{}", message);
    }
}

impl PluginConfig {
    /// Create a new empty config
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Build a config from an already-parsed TOML table
    pub fn from_table(table: toml::Table) -> Self {
        Self {
            values: table.into_iter().collect(),
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Returns an empty config if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let values: HashMap<String, toml::Value> =
            toml::from_str(&content).map_err(|e| PluginError::Config(e.to_string()))?;
        Ok(Self { values })
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|v| v.clone().try_into().ok())
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the config has no keys
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
