//! Plugin types and declaration structures

use serde::Serialize;
use serde_json::Value;

use crate::Plugin;

/// Descriptor for a type a unit exports.
///
/// `name` is the identifier the registry looks the type up by (the final
/// segment of a canonical plugin name), `contracts` the base contracts the
/// type satisfies, and `create` its no-argument constructor.
///
/// Descriptors read from a dynamic library point into it. They are only
/// valid while the library stays loaded, whatever their `'static` says.
#[derive(Clone, Copy)]
pub struct PluginType {
    /// Exported type identifier
    pub name: &'static str,
    /// Contracts (base types) this type satisfies
    pub contracts: &'static [&'static str],
    /// Default constructor
    pub create: fn() -> Box<dyn Plugin>,
}

impl PluginType {
    /// Describe a default-constructible plugin type
    pub const fn new<T: Plugin + Default + 'static>(
        name: &'static str,
        contracts: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            contracts,
            create: instantiate::<T>,
        }
    }

    /// Whether this type satisfies the named contract
    pub fn satisfies(&self, contract: &str) -> bool {
        self.contracts.contains(&contract)
    }

    /// Create a fresh instance
    pub fn instantiate(&self) -> Box<dyn Plugin> {
        (self.create)()
    }
}

impl std::fmt::Debug for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginType")
            .field("name", &self.name)
            .field("contracts", &self.contracts)
            .finish_non_exhaustive()
    }
}

fn instantiate<T: Plugin + Default + 'static>() -> Box<dyn Plugin> {
    Box::new(T::default())
}

/// Table of types a dynamic library unit exports.
///
/// Produced by [`export_plugins!`](crate::export_plugins) and read by the
/// registry through the `_pluggable_declare` entry point.
#[derive(Debug)]
pub struct UnitDeclaration {
    /// Exported types
    pub types: &'static [PluginType],
}

impl UnitDeclaration {
    /// Find an exported type by identifier
    pub fn find(&self, name: &str) -> Option<&PluginType> {
        self.types.iter().find(|t| t.name == name)
    }
}

/// Results of a capability fan-out, keyed by plugin name.
///
/// Entries keep the registry's load order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallResults {
    entries: Vec<(String, Value)>,
}

impl CallResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a plugin's result, replacing any earlier one for the same name
    pub fn insert(&mut self, plugin: impl Into<String>, value: Value) {
        let plugin = plugin.into();
        match self.entries.iter_mut().find(|(name, _)| *name == plugin) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((plugin, value)),
        }
    }

    /// Get the result a plugin returned
    pub fn get(&self, plugin: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == plugin)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, plugin: &str) -> bool {
        self.get(plugin).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plugin names that answered, in load order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl IntoIterator for CallResults {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
