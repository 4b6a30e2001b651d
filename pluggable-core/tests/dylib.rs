//! Native library units
//!
//! Builds `demos/hello-plugin` and loads it through [`DylibLoader`]. Ignored
//! by default because it runs a nested cargo build:
//!
//! ```bash
//! cargo test -p pluggable-core --test dylib -- --ignored
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use pluggable_core::{DylibLoader, Registry, RegistryConfig, UnitLoader, Value};
use tempfile::TempDir;

/// Build the demo unit and return the path of the built library
fn build_hello_plugin(target_dir: &Path) -> PathBuf {
    let manifest =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/hello-plugin/Cargo.toml");
    let status = Command::new(env!("CARGO"))
        .arg("build")
        .arg("--manifest-path")
        .arg(&manifest)
        .arg("--target-dir")
        .arg(target_dir)
        .status()
        .unwrap();
    assert!(status.success(), "building hello-plugin failed");

    target_dir.join("debug").join(format!(
        "{}hello_plugin{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    ))
}

/// A plugin directory holding `hello.<ext>` and its sidecar settings
fn install_hello(build: &TempDir) -> TempDir {
    let library = build_hello_plugin(build.path());
    let plugins = TempDir::new().unwrap();
    let extension = DylibLoader::new().extension().to_string();

    std::fs::copy(&library, plugins.path().join(format!("hello.{extension}"))).unwrap();
    std::fs::write(plugins.path().join("hello.toml"), "greeting = \"Howdy\"\n").unwrap();
    plugins
}

#[test]
#[ignore = "builds demos/hello-plugin with cargo"]
fn hello_plugin_loads_and_answers() {
    let build = TempDir::new().unwrap();
    let plugins = install_hello(&build);

    let config = RegistryConfig::new(plugins.path()).required_base("PluginBase");
    let registry = Registry::open(config, Arc::new(DylibLoader::new())).unwrap();
    assert_eq!(registry.names(), vec!["Hello"]);

    // Sidecar settings reach the load hook
    let greetings = registry.call("greet", &[Value::from("bob")]).unwrap();
    assert_eq!(greetings.get("Hello"), Some(&Value::from("Howdy, bob!")));

    let neighbours = registry.call("neighbours", &[]).unwrap();
    assert_eq!(neighbours.get("Hello"), Some(&Value::from(Vec::<String>::new())));

    let report = registry.force_reload().unwrap();
    assert_eq!(report.loaded, vec!["Hello"]);
}

#[test]
#[ignore = "builds demos/hello-plugin with cargo"]
fn hello_plugin_outlives_its_registry() {
    let build = TempDir::new().unwrap();
    let plugins = install_hello(&build);

    let registry =
        Registry::open(RegistryConfig::new(plugins.path()), Arc::new(DylibLoader::new())).unwrap();
    let hello = registry.lookup("Hello").unwrap();

    registry.unload("Hello").unwrap();
    drop(registry);

    // The handle keeps the library mapped, so its code still runs
    assert!(hello.responds_to("greet"));
    assert_eq!(hello.capabilities().len(), 3);
}
