//! pluggable-api - Plugin API for the pluggable runtime plugin registry
//!
//! This crate provides the traits and types needed to write plugins that a
//! `pluggable_core::Registry` can discover, load, reload and call into.
//! Plugins are either native Rust dynamic libraries or types compiled into the
//! host and bound to a name by a manifest file.
//!
//! A plugin answers to any number of named capabilities. The registry never
//! assumes a fixed interface: it asks each instance which capabilities it
//! answers to and fans calls out to those that do.
//!
//! # Example
//!
//! ```ignore
//! use pluggable_api::{export_plugins, Loadable, Plugin, PluginContext, PluginError};
//! use serde_json::Value;
//!
//! #[derive(Default)]
//! pub struct Greeter;
//!
//! impl Plugin for Greeter {
//!     fn capabilities(&self) -> &[&str] {
//!         &["description"]
//!     }
//!
//!     fn invoke(&self, capability: &str, _args: &[Value], _ctx: &PluginContext) -> Result<Value, PluginError> {
//!         match capability {
//!             "description" => Ok(Value::from("Says hello")),
//!             other => Err(PluginError::UnknownCapability(other.to_string())),
//!         }
//!     }
//!
//!     fn as_loadable(&mut self) -> Option<&mut dyn Loadable> {
//!         Some(self)
//!     }
//! }
//!
//! impl Loadable for Greeter {
//!     fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
//!         ctx.log_info("Greeter loaded!");
//!         Ok(())
//!     }
//! }
//!
//! export_plugins!(Greeter: ["PluginBase"]);
//! ```

pub mod context;
pub mod error;
pub mod types;

pub use context::{Dispatch, PluginConfig, PluginContext};
pub use error::PluginError;
pub use serde_json::Value;
pub use types::*;

/// Current plugin API version. Dynamic library units must match this exactly.
pub const API_VERSION: u32 = 1;

/// The core plugin trait - implement this to create a plugin.
///
/// Everything has a default, so the smallest plugin is an empty impl on a
/// `Default` type. Lifecycle hooks are opt-in through [`Loadable`] and
/// [`Unloadable`]; a plugin that does not expose them simply has no hook.
pub trait Plugin: Send + Sync {
    /// Names of the capabilities this instance answers to.
    ///
    /// The names borrow from the instance. Code from a dynamic library unit
    /// is unmapped once the unit goes away, so nothing handed out here may
    /// outlive the instance.
    fn capabilities(&self) -> &[&str] {
        &[]
    }

    /// Whether this instance answers to `capability`
    fn responds_to(&self, capability: &str) -> bool {
        self.capabilities().iter().any(|c| *c == capability)
    }

    /// Invoke one of the capabilities listed by [`Plugin::capabilities`]
    fn invoke(
        &self,
        capability: &str,
        _args: &[Value],
        _ctx: &PluginContext,
    ) -> Result<Value, PluginError> {
        Err(PluginError::UnknownCapability(capability.to_string()))
    }

    /// Expose the load hook, if this plugin has one
    fn as_loadable(&mut self) -> Option<&mut dyn Loadable> {
        None
    }

    /// Expose the unload hook, if this plugin has one
    fn as_unloadable(&self) -> Option<&dyn Unloadable> {
        None
    }
}

/// Hook run once after the plugin is instantiated, before it is visible to
/// other callers.
pub trait Loadable {
    fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError>;
}

/// Hook run before the plugin is removed from its registry.
pub trait Unloadable {
    fn on_unload(&self, ctx: &PluginContext) -> Result<(), PluginError>;
}

/// Export plugin types from a dynamic library unit.
///
/// Each type must implement [`Plugin`] and [`Default`]; its Rust identifier
/// becomes the exported type name. Contracts the type satisfies may follow in
/// brackets.
///
/// # Usage
///
/// ```ignore
/// pluggable_api::export_plugins!(Greeter: ["PluginBase"], Counter);
/// ```
///
/// # Generated Functions
///
/// - `_pluggable_api_version()`: Returns the API version
/// - `_pluggable_declare()`: Returns the unit's [`UnitDeclaration`]
#[macro_export]
macro_rules! export_plugins {
    ($($plugin_type:ident $(: [$($contract:expr),* $(,)?])?),+ $(,)?) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _pluggable_api_version() -> u32 {
            $crate::API_VERSION
        }

        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn _pluggable_declare() -> *const $crate::UnitDeclaration {
            static TYPES: &[$crate::PluginType] = &[
                $($crate::PluginType::new::<$plugin_type>(
                    stringify!($plugin_type),
                    &[$($($contract),*)?],
                )),+
            ];
            static DECLARATION: $crate::UnitDeclaration = $crate::UnitDeclaration { types: TYPES };
            &DECLARATION
        }
    };
}
