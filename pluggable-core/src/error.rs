//! Registry error types

use std::path::PathBuf;
use thiserror::Error;

use pluggable_api::PluginError;

/// Errors that can occur in the plugin registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The unit does not export the type its file name promises
    #[error("{path} must define {type_name}")]
    ClassNotFound { path: PathBuf, type_name: String },

    /// The exported type does not satisfy the configured base contract
    #[error("The type {type_name} must implement {base}")]
    NotInheritAbstractClass { type_name: String, base: String },

    /// API version mismatch between the registry and a dynamic library unit
    #[error("API version mismatch: registry expects {expected}, unit has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// Failed to load dynamic library
    #[error("Failed to load plugin library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// A catalog manifest could not be resolved
    #[error("Invalid unit manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    /// Registry configuration could not be read
    #[error("Configuration error: {0}")]
    Config(String),

    /// A lifecycle hook the plugin defines failed
    #[error("Plugin '{plugin}' failed in {hook}: {source}")]
    Hook {
        plugin: String,
        hook: &'static str,
        #[source]
        source: PluginError,
    },

    /// A plugin that answers to a capability failed while running it
    #[error("Plugin '{plugin}' failed in capability '{capability}': {source}")]
    Capability {
        plugin: String,
        capability: String,
        #[source]
        source: PluginError,
    },

    /// Built-in registry operations can't be forwarded to plugins
    #[error("'{0}' is a registry operation and can't be forwarded")]
    ReservedOperation(String),

    /// The except pattern is not a valid regular expression
    #[error("Invalid except pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// No registry is configured under this accessor name
    #[error("No registry configured for accessor '{0}'")]
    UnknownAccessor(String),

    /// File watcher error
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
