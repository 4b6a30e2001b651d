//! Catalog units - manifests binding names to compiled-in plugin types

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use pluggable_api::{Plugin, PluginConfig, PluginType};

use super::{Unit, UnitLoader};
use crate::error::RegistryError;

/// Plugin types compiled into the host, keyed by implementation name
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    types: HashMap<String, PluginType>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register a type under `key`
    pub fn with(mut self, key: impl Into<String>, ty: PluginType) -> Self {
        self.register(key, ty);
        self
    }

    /// Register a type under `key`, replacing any earlier registration
    pub fn register(&mut self, key: impl Into<String>, ty: PluginType) {
        self.types.insert(key.into(), ty);
    }

    pub fn get(&self, key: &str) -> Option<PluginType> {
        self.types.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Loads TOML unit manifests resolved against a [`Catalog`].
///
/// A manifest binds exported type names to catalog keys and may carry
/// settings for the plugin:
///
/// ```toml
/// [export]
/// Test = "test"
///
/// [config]
/// greeting = "hello"
/// ```
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    catalog: Arc<Catalog>,
}

impl CatalogLoader {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnitManifest {
    #[serde(default)]
    export: HashMap<String, String>,
    #[serde(default)]
    config: toml::Table,
}

/// A resolved manifest
struct CatalogUnit {
    exports: HashMap<String, PluginType>,
    config: PluginConfig,
}

impl UnitLoader for CatalogLoader {
    fn extension(&self) -> &str {
        "toml"
    }

    fn open(&self, path: &Path) -> Result<Arc<dyn Unit>, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        let manifest: UnitManifest =
            toml::from_str(&content).map_err(|e| RegistryError::Manifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut exports = HashMap::with_capacity(manifest.export.len());
        for (name, key) in manifest.export {
            let ty = self.catalog.get(&key).ok_or_else(|| RegistryError::Manifest {
                path: path.to_path_buf(),
                reason: format!("no catalog entry '{key}' for exported type {name}"),
            })?;
            exports.insert(name, ty);
        }

        Ok(Arc::new(CatalogUnit {
            exports,
            config: PluginConfig::from_table(manifest.config),
        }))
    }
}

impl Unit for CatalogUnit {
    fn contracts(&self, type_name: &str) -> Option<Vec<String>> {
        let ty = self.exports.get(type_name)?;
        Some(ty.contracts.iter().map(|c| c.to_string()).collect())
    }

    // Catalog types are compiled into the host, so instances never outlive their code
    unsafe fn instantiate(&self, type_name: &str) -> Option<Box<dyn Plugin>> {
        self.exports.get(type_name).map(PluginType::instantiate)
    }

    fn config(&self) -> PluginConfig {
        self.config.clone()
    }
}
