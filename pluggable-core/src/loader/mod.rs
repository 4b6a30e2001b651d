//! Unit loaders - turn a plugin file into the types it exports
//!
//! Every load opens its unit afresh, so types and state from one plugin (or
//! from an earlier reload of the same plugin) never leak into another.
//!
//! - [`DylibLoader`]: native dynamic libraries built with `export_plugins!`
//! - [`CatalogLoader`]: TOML manifests binding names to types compiled into
//!   the host

mod catalog;
mod dylib;

use std::path::Path;
use std::sync::Arc;

use pluggable_api::{Plugin, PluginConfig};

use crate::error::RegistryError;

pub use catalog::{Catalog, CatalogLoader};
pub use dylib::DylibLoader;

/// Opens plugin unit files of one kind
pub trait UnitLoader: Send + Sync {
    /// File extension (without the dot) of the units this loader opens
    fn extension(&self) -> &str;

    /// Open the unit at `path` in a fresh namespace
    fn open(&self, path: &Path) -> Result<Arc<dyn Unit>, RegistryError>;
}

/// An opened unit.
///
/// Nothing a unit hands out borrows from it except through the instances
/// [`Unit::instantiate`] creates, and those must be dropped before the unit.
/// The registry keeps each instance next to its unit for that reason.
pub trait Unit: Send + Sync {
    /// Contracts an exported type satisfies, or `None` if the unit doesn't
    /// export `type_name`
    fn contracts(&self, type_name: &str) -> Option<Vec<String>>;

    /// Create an instance of an exported type
    ///
    /// # Safety
    /// The instance may run code that lives in the unit, such as a mapped
    /// library. The caller must drop it before the last handle on the unit.
    unsafe fn instantiate(&self, type_name: &str) -> Option<Box<dyn Plugin>>;

    /// Settings shipped with the unit
    fn config(&self) -> PluginConfig {
        PluginConfig::new()
    }
}
