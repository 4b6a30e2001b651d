//! Named accessors - several independent registries owned by one host

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::loader::UnitLoader;
use crate::registry::Registry;

/// A set of registries keyed by accessor name (`plugins`, `filters`, ...).
///
/// Each accessor has its own configuration. Its registry is opened, and its
/// search path scanned, the first time it is asked for; later calls return
/// the same registry.
pub struct Pluggable {
    loader: Arc<dyn UnitLoader>,
    configs: HashMap<String, RegistryConfig>,
    opened: Mutex<HashMap<String, Registry>>,
}

impl Pluggable {
    pub fn new(loader: Arc<dyn UnitLoader>) -> Self {
        Self {
            loader,
            configs: HashMap::new(),
            opened: Mutex::new(HashMap::new()),
        }
    }

    /// Builder: configure an accessor
    pub fn with(mut self, accessor: impl Into<String>, config: RegistryConfig) -> Self {
        self.configs.insert(accessor.into(), config);
        self
    }

    /// Builder: configure an accessor whose search path is its own name
    pub fn with_defaults(self, accessor: &str) -> Self {
        self.with(accessor, RegistryConfig::for_accessor(accessor))
    }

    /// Configured accessor names, sorted
    pub fn accessors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.configs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get the registry behind `accessor`, opening it on first use
    pub fn registry(&self, accessor: &str) -> Result<Registry, RegistryError> {
        let config = self
            .configs
            .get(accessor)
            .ok_or_else(|| RegistryError::UnknownAccessor(accessor.to_string()))?;

        let mut opened = self.opened.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(registry) = opened.get(accessor) {
            return Ok(registry.clone());
        }

        let registry = Registry::open(config.clone(), self.loader.clone())?;
        tracing::debug!(accessor, plugins = registry.len(), "Registry opened");
        opened.insert(accessor.to_string(), registry.clone());
        Ok(registry)
    }
}
