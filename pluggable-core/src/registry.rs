//! Registry - plugin lifecycle and capability dispatch

use serde_json::Value;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::SystemTime;

use pluggable_api::{CallResults, Dispatch, Plugin, PluginContext, PluginError};
use regex::Regex;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::loader::{Unit, UnitLoader};
use crate::naming;

/// Operations the registry answers itself; never forwarded to plugins
pub const RESERVED_OPERATIONS: &[&str] = &[
    "load",
    "unload",
    "reload",
    "reload_all",
    "lookup",
    "enumerate",
    "call",
    "forward",
    "force_reload",
];

/// Shared handle to a loaded plugin instance.
///
/// Keeps the unit the instance came from alive, so a handle held past an
/// unload or reload still points at mapped code. The handle no longer refers
/// to the registry's current instance once that happens.
#[derive(Clone)]
pub struct PluginRef {
    // Declared before `unit` so the instance drops first
    instance: Arc<dyn Plugin>,
    unit: Arc<dyn Unit>,
}

impl PluginRef {
    /// Whether both handles point at the same instance
    pub fn same_instance(a: &PluginRef, b: &PluginRef) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&a.instance), Arc::as_ptr(&b.instance))
    }

    /// The unit this instance was created from
    pub fn unit(&self) -> &Arc<dyn Unit> {
        &self.unit
    }
}

impl Deref for PluginRef {
    type Target = dyn Plugin;

    fn deref(&self) -> &Self::Target {
        self.instance.as_ref()
    }
}

impl std::fmt::Debug for PluginRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRef")
            .field("capabilities", &self.instance.capabilities())
            .finish_non_exhaustive()
    }
}

/// A loaded plugin with its runtime state
struct PluginEntry {
    name: String,
    plugin: PluginRef,
    context: Arc<PluginContext>,
    loaded_at: SystemTime,
}

/// Outcome of a bulk reload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    /// Plugins loaded or re-instantiated by this pass, in scan order
    pub loaded: Vec<String>,
    /// Plugins removed by this pass. Bulk reloads never remove plugins whose
    /// file disappeared, so this stays empty.
    pub unloaded: Vec<String>,
}

/// The plugin registry: loads, unloads and reloads plugins from one search
/// directory and fans capability calls out to them.
///
/// Cloning a `Registry` yields another handle to the same plugin set.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
}

struct Shared {
    config: RegistryConfig,
    except: Option<Regex>,
    loader: Arc<dyn UnitLoader>,
    /// Loaded plugins in load order, unique by name
    entries: Mutex<Vec<PluginEntry>>,
}

impl Registry {
    /// Create an empty registry. Nothing is scanned until a reload.
    pub fn new(
        config: RegistryConfig,
        loader: Arc<dyn UnitLoader>,
    ) -> Result<Self, RegistryError> {
        let except = config.except.as_deref().map(Regex::new).transpose()?;

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                except,
                loader,
                entries: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Create a registry and load everything in its search path
    pub fn open(
        config: RegistryConfig,
        loader: Arc<dyn UnitLoader>,
    ) -> Result<Self, RegistryError> {
        let registry = Self::new(config, loader)?;
        registry.reload_all()?;
        Ok(registry)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    pub fn search_path(&self) -> &Path {
        &self.shared.config.search_path
    }

    // ─── Loader ──────────────────────────────────────────────────────

    /// Load the plugin called `name`.
    ///
    /// Returns `Ok(None)` without doing anything if it is already loaded,
    /// otherwise `Ok(Some(name))` once the plugin is instantiated, its
    /// `on_load` hook has run and it is visible to other callers. A failed
    /// load leaves the registry untouched. If a concurrent load of the same
    /// name wins, this instance gets its `on_unload` hook and `Ok(None)`.
    pub fn load(&self, name: &str) -> Result<Option<String>, RegistryError> {
        if self.shared.contains(name) {
            tracing::debug!(plugin = %name, "Plugin already loaded, skipping");
            return Ok(None);
        }

        let path = self.locate_unit(name)?;
        // Surface a missing or unreadable file as plain IO
        std::fs::metadata(&path)?;

        let unit = self.shared.loader.open(&path)?;

        let type_name = naming::type_identifier(name);
        let class_not_found = || RegistryError::ClassNotFound {
            path: path.clone(),
            type_name: type_name.to_string(),
        };
        let contracts = unit.contracts(type_name).ok_or_else(class_not_found)?;

        if let Some(base) = &self.shared.config.required_base
            && !contracts.iter().any(|c| c == base)
        {
            return Err(RegistryError::NotInheritAbstractClass {
                type_name: type_name.to_string(),
                base: base.clone(),
            });
        }

        // SAFETY: `instance` is declared after `unit`, so it drops first on every
        // early return; once stored it sits in a PluginRef that also drops it first.
        let mut instance = unsafe { unit.instantiate(type_name) }.ok_or_else(class_not_found)?;
        let loaded_at = SystemTime::now();

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let registry: Weak<dyn Dispatch> = shared;
        let context = PluginContext::new(name, &path)
            .with_config(unit.config())
            .with_registry(registry);

        if let Some(hook) = instance.as_loadable() {
            hook.on_load(&context).map_err(|source| RegistryError::Hook {
                plugin: name.to_string(),
                hook: "on_load",
                source,
            })?;
        }

        let entry = PluginEntry {
            name: name.to_string(),
            plugin: PluginRef {
                instance: Arc::from(instance),
                unit,
            },
            context: Arc::new(context),
            loaded_at,
        };

        let discarded = {
            let mut entries = self.shared.entries();
            if entries.iter().any(|e| e.name == name) {
                Some(entry)
            } else {
                entries.push(entry);
                None
            }
        };

        if let Some(entry) = discarded {
            // Another caller loaded it first; tear ours down like any other unload
            tracing::warn!(plugin = %name, "Plugin loaded concurrently, discarding duplicate");
            if let Err(e) = run_unload_hook(name, &entry.plugin, &entry.context) {
                tracing::warn!(plugin = %name, error = %e, "Discarded duplicate failed to unload");
            }
            return Ok(None);
        }

        tracing::info!(plugin = %name, unit = %path.display(), "Plugin loaded");
        Ok(Some(name.to_string()))
    }

    /// Unload the plugin called `name`.
    ///
    /// Runs the plugin's `on_unload` hook first. Returns `Ok(false)` if it was
    /// not loaded. If the hook fails the plugin stays loaded.
    pub fn unload(&self, name: &str) -> Result<bool, RegistryError> {
        let Some((plugin, context)) = self.shared.find(name) else {
            return Ok(false);
        };

        run_unload_hook(name, &plugin, &context)?;

        let mut entries = self.shared.entries();
        let removed = match entries.iter().position(|e| e.name == name) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        };
        drop(entries);

        if removed {
            tracing::info!(plugin = %name, "Plugin unloaded");
        }
        Ok(removed)
    }

    /// Unload then load `name`, unconditionally
    pub fn reload(&self, name: &str) -> Result<String, RegistryError> {
        self.unload(name)?;
        self.load(name)?;
        Ok(name.to_string())
    }

    /// Scan the search path and bring the registry up to date.
    ///
    /// Units not yet loaded are loaded; loaded units whose file changed after
    /// they were loaded are reloaded; everything else is left alone. The
    /// first failure aborts the pass, keeping whatever it already did.
    pub fn reload_all(&self) -> Result<ReloadReport, RegistryError> {
        let mut report = ReloadReport::default();

        for path in self.discover_units()? {
            let Some(name) = self.name_for(&path) else {
                continue;
            };

            if let Some(pattern) = &self.shared.except
                && pattern.is_match(&name)
            {
                tracing::debug!(plugin = %name, "Plugin excluded, skipping");
                continue;
            }

            match self.loaded_at(&name) {
                Some(loaded_at) => {
                    let modified = std::fs::metadata(&path)?.modified()?;
                    if modified > loaded_at {
                        tracing::debug!(plugin = %name, "Plugin unit changed, reloading");
                        report.loaded.push(self.reload(&name)?);
                    }
                }
                None => report.loaded.push(self.reload(&name)?),
            }
        }

        Ok(report)
    }

    /// Tear every plugin down, forget them all, then load from scratch
    pub fn force_reload(&self) -> Result<ReloadReport, RegistryError> {
        for (name, plugin, context) in self.shared.snapshot() {
            run_unload_hook(&name, &plugin, &context)?;
        }
        self.shared.entries().clear();
        tracing::info!(dir = %self.search_path().display(), "Registry cleared");

        self.reload_all()
    }

    // ─── Dispatcher ──────────────────────────────────────────────────

    /// Get the live instance of `name`
    pub fn lookup(&self, name: &str) -> Option<PluginRef> {
        self.shared.find(name).map(|(plugin, _)| plugin)
    }

    /// All loaded plugins, in load order
    pub fn enumerate(&self) -> Vec<(String, PluginRef)> {
        self.shared
            .entries()
            .iter()
            .map(|e| (e.name.clone(), e.plugin.clone()))
            .collect()
    }

    /// Names of all loaded plugins, in load order
    pub fn names(&self) -> Vec<String> {
        self.shared.names()
    }

    /// When `name` was loaded
    pub fn loaded_at(&self, name: &str) -> Option<SystemTime> {
        self.shared
            .entries()
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.loaded_at)
    }

    /// Get the number of loaded plugins
    pub fn len(&self) -> usize {
        self.shared.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke `capability` on every loaded plugin that answers to it.
    ///
    /// Plugins without the capability are skipped. A plugin error aborts the
    /// fan-out and discards the results gathered so far.
    pub fn call(&self, capability: &str, args: &[Value]) -> Result<CallResults, RegistryError> {
        self.shared.call(capability, args)
    }

    /// Treat `operation` as a capability and fan it out, unless it names one
    /// of the registry's own operations.
    pub fn forward(&self, operation: &str, args: &[Value]) -> Result<CallResults, RegistryError> {
        if RESERVED_OPERATIONS.contains(&operation) {
            return Err(RegistryError::ReservedOperation(operation.to_string()));
        }
        self.call(operation, args)
    }

    // ─── Scanning ────────────────────────────────────────────────────

    fn unit_path(&self, name: &str) -> PathBuf {
        self.search_path().join(format!(
            "{}.{}",
            naming::name_to_path(name),
            self.shared.loader.extension()
        ))
    }

    /// File holding `name`: the path the name maps to, or failing that a
    /// sibling carrying a load-order prefix (`10_test.toml` for `Test`)
    fn locate_unit(&self, name: &str) -> Result<PathBuf, RegistryError> {
        let path = self.unit_path(name);
        if path.exists() {
            return Ok(path);
        }

        let (Some(dir), Some(file)) = (path.parent(), path.file_name().and_then(|f| f.to_str()))
        else {
            return Ok(path);
        };
        if !dir.is_dir() {
            return Ok(path);
        }

        let mut prefixed = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let candidate = entry?.path();
            let Some(candidate_file) = candidate.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            if candidate_file.starts_with(|c: char| c.is_ascii_digit())
                && naming::strip_order_prefix(candidate_file).trim_start_matches('_') == file
            {
                prefixed.push(candidate);
            }
        }
        prefixed.sort();

        Ok(prefixed.into_iter().next().unwrap_or(path))
    }

    /// Canonical name for a unit file found under the search path
    fn name_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(self.search_path()).ok()?;
        let stem = relative.file_stem()?.to_str()?;

        let mut segments = Vec::new();
        if let Some(parent) = relative.parent() {
            for component in parent.components() {
                segments.push(component.as_os_str().to_str()?.to_string());
            }
        }
        segments.push(naming::strip_order_prefix(stem).to_string());

        Some(naming::path_to_name(&segments.join("/")))
    }

    /// Unit files under the search path, in sorted order
    fn discover_units(&self) -> Result<Vec<PathBuf>, RegistryError> {
        let mut found = Vec::new();
        let base_dir = self.search_path();

        if !base_dir.exists() {
            tracing::debug!(dir = %base_dir.display(), "Plugin directory does not exist");
            return Ok(found);
        }

        collect_units(base_dir, self.shared.loader.extension(), &mut found)?;
        found.sort();
        Ok(found)
    }
}

fn collect_units(dir: &Path, extension: &str, found: &mut Vec<PathBuf>) -> Result<(), RegistryError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // Symlinked directories are not descended into, so links can't loop the scan
        if entry.file_type()?.is_dir() {
            collect_units(&path, extension, found)?;
        } else if path.extension().is_some_and(|ext| ext == extension) {
            found.push(path);
        }
    }
    Ok(())
}

fn run_unload_hook(
    name: &str,
    plugin: &PluginRef,
    context: &PluginContext,
) -> Result<(), RegistryError> {
    match plugin.as_unloadable() {
        Some(hook) => hook.on_unload(context).map_err(|source| RegistryError::Hook {
            plugin: name.to_string(),
            hook: "on_unload",
            source,
        }),
        None => Ok(()),
    }
}

impl Shared {
    fn entries(&self) -> MutexGuard<'_, Vec<PluginEntry>> {
        // Entries are only pushed or removed whole, so a poisoned table is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn contains(&self, name: &str) -> bool {
        self.entries().iter().any(|e| e.name == name)
    }

    fn find(&self, name: &str) -> Option<(PluginRef, Arc<PluginContext>)> {
        self.entries()
            .iter()
            .find(|e| e.name == name)
            .map(|e| (e.plugin.clone(), e.context.clone()))
    }

    fn names(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.name.clone()).collect()
    }

    /// Copy of the table so plugins run without the lock held
    fn snapshot(&self) -> Vec<(String, PluginRef, Arc<PluginContext>)> {
        self.entries()
            .iter()
            .map(|e| (e.name.clone(), e.plugin.clone(), e.context.clone()))
            .collect()
    }

    fn call(&self, capability: &str, args: &[Value]) -> Result<CallResults, RegistryError> {
        let mut results = CallResults::new();

        for (name, plugin, context) in self.snapshot() {
            if !plugin.responds_to(capability) {
                continue;
            }
            let value = plugin
                .invoke(capability, args, &context)
                .map_err(|source| RegistryError::Capability {
                    plugin: name.clone(),
                    capability: capability.to_string(),
                    source,
                })?;
            results.insert(name, value);
        }

        Ok(results)
    }
}

impl Dispatch for Shared {
    fn plugin_names(&self) -> Vec<String> {
        self.names()
    }

    fn call(&self, capability: &str, args: &[Value]) -> Result<CallResults, PluginError> {
        Shared::call(self, capability, args).map_err(|e| PluginError::Dispatch(e.to_string()))
    }
}
