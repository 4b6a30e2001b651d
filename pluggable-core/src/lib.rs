//! pluggable-core: Runtime plugin registry
//!
//! This crate discovers, instantiates, tracks and hot-reloads plugins living
//! under a search directory, and fans named capabilities out to them:
//!
//! - **Registry** - [`Registry`] owns the loaded plugins and their load/unload/reload lifecycle
//! - **Dispatch** - [`Registry::call`] and [`Registry::forward`] invoke a capability on every plugin answering to it
//! - **Naming** - [`naming`] maps `Foo::FooBar` to `foo/foo_bar` and back
//! - **Loaders** - [`DylibLoader`] for native libraries, [`CatalogLoader`] for compiled-in types
//! - **Hot reload** - [`RegistryWatcher`] reloads when the search directory changes
//! - **Accessors** - [`Pluggable`] keeps several named registries for one host
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pluggable_core::{DylibLoader, Registry, RegistryConfig};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RegistryConfig::new("plugins").required_base("PluginBase");
//!     let registry = Registry::open(config, Arc::new(DylibLoader::new()))?;
//!
//!     // Ask every plugin that can describe itself
//!     for (name, description) in registry.call("description", &[])? {
//!         println!("{name}: {description}");
//!     }
//!
//!     // Pick up edited or new units
//!     let report = registry.reload_all()?;
//!     println!("reloaded: {:?}", report.loaded);
//!     Ok(())
//! }
//! ```
//!
//! # Layout
//!
//! ```text
//! plugins/
//! ├── test.so              -> Test
//! ├── 10_audit.so          -> Audit (prefix only orders the scan)
//! └── foo/
//!     └── foo_bar.so       -> Foo::FooBar
//! ```

pub mod accessor;
pub mod config;
pub mod error;
pub mod loader;
pub mod naming;
pub mod registry;
pub mod watcher;

pub use accessor::Pluggable;
pub use config::RegistryConfig;
pub use error::RegistryError;
pub use loader::{Catalog, CatalogLoader, DylibLoader, Unit, UnitLoader};
pub use registry::{PluginRef, RESERVED_OPERATIONS, Registry, ReloadReport};
pub use watcher::RegistryWatcher;

pub use pluggable_api::{CallResults, Plugin, PluginContext, PluginError, PluginType, Value};
