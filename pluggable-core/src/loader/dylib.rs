//! Dynamic library units

use libloading::Library;
use std::path::Path;
use std::sync::Arc;

use pluggable_api::{API_VERSION, Plugin, PluginConfig, PluginType, UnitDeclaration};

use super::{Unit, UnitLoader};
use crate::error::RegistryError;

/// Loads units built as native dynamic libraries.
///
/// A library must export the entry points generated by
/// `pluggable_api::export_plugins!`. Settings are read from a sidecar TOML
/// file with the library's stem (`greeter.so` -> `greeter.toml`).
#[derive(Debug, Default, Clone)]
pub struct DylibLoader;

impl DylibLoader {
    pub fn new() -> Self {
        Self
    }
}

/// A loaded library and the types it declared
struct DylibUnit {
    /// Point into the library; never handed out
    types: Vec<PluginType>,
    config: PluginConfig,
    /// Keep the library loaded
    _library: Library,
}

impl UnitLoader for DylibLoader {
    fn extension(&self) -> &str {
        if cfg!(target_os = "macos") {
            "dylib"
        } else if cfg!(target_os = "windows") {
            "dll"
        } else {
            "so"
        }
    }

    fn open(&self, path: &Path) -> Result<Arc<dyn Unit>, RegistryError> {
        // SAFETY: plugins are trusted code living in the configured search path.
        // The library is expected to follow the export_plugins! contract.
        let library = unsafe { Library::new(path)? };

        // SAFETY: We're calling a C function exported by the plugin.
        let api_version_fn: libloading::Symbol<extern "C" fn() -> u32> =
            unsafe { library.get(b"_pluggable_api_version")? };

        let unit_api_version = api_version_fn();
        if unit_api_version != API_VERSION {
            return Err(RegistryError::ApiVersionMismatch {
                expected: API_VERSION,
                found: unit_api_version,
            });
        }

        // SAFETY: The declaration is a static inside the library, built with the
        // same API version. The descriptors copied out of it stay private to the
        // unit, which owns the library, so they never outlive the mapping.
        let declare_fn: libloading::Symbol<extern "C" fn() -> *const UnitDeclaration> =
            unsafe { library.get(b"_pluggable_declare")? };
        let declaration = declare_fn();
        if declaration.is_null() {
            return Err(RegistryError::Manifest {
                path: path.to_path_buf(),
                reason: "library returned no declaration".to_string(),
            });
        }
        let types = unsafe { (*declaration).types.to_vec() };

        let config = PluginConfig::load(&path.with_extension("toml")).map_err(|e| {
            RegistryError::Manifest {
                path: path.with_extension("toml"),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(unit = %path.display(), types = types.len(), "Library opened");

        Ok(Arc::new(DylibUnit {
            types,
            config,
            _library: library,
        }))
    }
}

impl Unit for DylibUnit {
    fn contracts(&self, type_name: &str) -> Option<Vec<String>> {
        let ty = self.types.iter().find(|t| t.name == type_name)?;
        Some(ty.contracts.iter().map(|c| c.to_string()).collect())
    }

    unsafe fn instantiate(&self, type_name: &str) -> Option<Box<dyn Plugin>> {
        self.types
            .iter()
            .find(|t| t.name == type_name)
            .map(PluginType::instantiate)
    }

    fn config(&self) -> PluginConfig {
        self.config.clone()
    }
}
