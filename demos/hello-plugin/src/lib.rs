//! Hello Plugin - A simple example plugin unit
//!
//! This unit demonstrates:
//! - Exporting a type with the `export_plugins!` macro
//! - Answering to capabilities (`description`, `greet`)
//! - Reading unit settings and running a load hook
//! - Calling sibling plugins through the registry back-reference
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! The file name decides the plugin name, so the library is renamed after
//! the exported type:
//!
//! ```bash
//! mkdir -p plugins
//! cp target/release/libhello_plugin.so plugins/hello.so
//! printf 'greeting = "Howdy"\n' > plugins/hello.toml
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use pluggable_api::{
    Loadable, Plugin, PluginContext, PluginError, Unloadable, Value, export_plugins,
};

/// Greets by name and keeps count of how often it did.
pub struct Hello {
    greeting: String,
    greeted: AtomicU32,
}

impl Default for Hello {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
            greeted: AtomicU32::new(0),
        }
    }
}

impl Plugin for Hello {
    fn capabilities(&self) -> &[&str] {
        &["description", "greet", "neighbours"]
    }

    fn invoke(
        &self,
        capability: &str,
        args: &[Value],
        ctx: &PluginContext,
    ) -> Result<Value, PluginError> {
        match capability {
            "description" => Ok(Value::from("Says hello to whoever asks.")),
            "greet" => {
                let who = args.first().and_then(Value::as_str).unwrap_or("world");
                let count = self.greeted.fetch_add(1, Ordering::Relaxed) + 1;
                ctx.log_debug(&format!("Greeting #{count}"));
                Ok(Value::from(format!("{}, {}!", self.greeting, who)))
            }
            "neighbours" => {
                let registry = ctx
                    .registry()
                    .ok_or_else(|| PluginError::custom("registry is gone"))?;
                let others: Vec<String> = registry
                    .plugin_names()
                    .into_iter()
                    .filter(|name| name != ctx.plugin_name())
                    .collect();
                Ok(Value::from(others))
            }
            other => Err(PluginError::UnknownCapability(other.to_string())),
        }
    }

    fn as_loadable(&mut self) -> Option<&mut dyn Loadable> {
        Some(self)
    }

    fn as_unloadable(&self) -> Option<&dyn Unloadable> {
        Some(self)
    }
}

impl Loadable for Hello {
    fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        if let Some(greeting) = ctx.config_get::<String>("greeting") {
            if greeting.is_empty() {
                return Err(PluginError::invalid_input("greeting must not be empty"));
            }
            self.greeting = greeting;
        }
        ctx.log_info("Hello plugin loaded!");
        Ok(())
    }
}

impl Unloadable for Hello {
    fn on_unload(&self, ctx: &PluginContext) -> Result<(), PluginError> {
        ctx.log_info(&format!(
            "Hello plugin unloading after {} greetings",
            self.greeted.load(Ordering::Relaxed)
        ));
        Ok(())
    }
}

// Generates the C ABI entry points the registry's dylib loader looks for
export_plugins!(Hello: ["PluginBase"]);
