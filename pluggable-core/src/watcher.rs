//! File watcher that hot-reloads a registry with debouncing

use notify::{RecursiveMode, Watcher, recommended_watcher};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::RegistryError;
use crate::registry::{Registry, ReloadReport};

/// Watches a registry's search path and runs a bulk reload once changes settle
pub struct RegistryWatcher {
    registry: Registry,
    _watcher: notify::RecommendedWatcher,
}

impl RegistryWatcher {
    /// Start watching `registry`'s search path
    ///
    /// # Arguments
    /// * `registry` - The registry to keep up to date
    /// * `debounce_ms` - Milliseconds to wait for a quiet period before reloading
    ///
    /// Must be called from within a tokio runtime. The search path must exist.
    pub async fn new(registry: Registry, debounce_ms: u64) -> Result<Self, RegistryError> {
        let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>(100);

        let mut watcher = recommended_watcher(move |event| {
            // Use blocking_send since this callback runs in the notify thread
            let _ = tx.blocking_send(event);
        })?;

        tracing::debug!(dir = %registry.search_path().display(), "Watching plugin directory");
        watcher.watch(registry.search_path(), RecursiveMode::Recursive)?;

        let loop_registry = registry.clone();
        tokio::spawn(async move {
            Self::debounce_loop(rx, loop_registry, Duration::from_millis(debounce_ms)).await;
        });

        Ok(Self {
            registry,
            _watcher: watcher,
        })
    }

    /// The registry being kept up to date
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Force a bulk reload now
    pub async fn refresh(&self) -> Result<ReloadReport, RegistryError> {
        tracing::info!("Forcing plugin reload");
        reload_blocking(self.registry.clone()).await
    }

    /// Debounce loop that waits for events, then waits for a quiet period before reloading
    async fn debounce_loop(
        mut rx: mpsc::Receiver<notify::Result<notify::Event>>,
        registry: Registry,
        debounce: Duration,
    ) {
        loop {
            // Wait for first event
            match rx.recv().await {
                None => break,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Watch error");
                    continue;
                }
                Some(Ok(_)) => {}
            }

            tracing::debug!("Plugin change detected, starting debounce");

            // Drain any pending events and wait for quiet period
            loop {
                match tokio::time::timeout(debounce, rx.recv()).await {
                    Ok(Some(_)) => {
                        tracing::debug!("More events during debounce, resetting timer");
                    }
                    Ok(None) => return,
                    Err(_) => break,
                }
            }

            match reload_blocking(registry.clone()).await {
                Ok(report) => {
                    tracing::info!(loaded = ?report.loaded, "Plugins reloaded");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reload plugins");
                }
            }
        }
    }
}

/// Reloads touch the filesystem and run plugin hooks, so keep them off the async workers
async fn reload_blocking(registry: Registry) -> Result<ReloadReport, RegistryError> {
    tokio::task::spawn_blocking(move || registry.reload_all())
        .await
        .map_err(|e| RegistryError::Io(std::io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::loader::{Catalog, CatalogLoader};
    use pluggable_api::{Plugin, PluginType};
    use std::sync::Arc;

    #[derive(Default)]
    struct Watched;

    impl Plugin for Watched {}

    fn registry(dir: &std::path::Path) -> Registry {
        let catalog = Catalog::new().with("watched", PluginType::new::<Watched>("Watched", &[]));
        Registry::new(
            RegistryConfig::new(dir),
            Arc::new(CatalogLoader::new(catalog)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_watcher_missing_directory_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = RegistryWatcher::new(registry(&temp_dir.path().join("absent")), 50).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_watcher_refresh_loads_units() {
        let temp_dir = tempfile::tempdir().unwrap();
        let watcher = RegistryWatcher::new(registry(temp_dir.path()), 50)
            .await
            .unwrap();

        std::fs::write(
            temp_dir.path().join("watched.toml"),
            "[export]\nWatched = \"watched\"\n",
        )
        .unwrap();

        // Whichever of refresh and the debounce loop runs first loads it
        watcher.refresh().await.unwrap();
        assert!(watcher.registry().lookup("Watched").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_watcher_picks_up_new_units() {
        let temp_dir = tempfile::tempdir().unwrap();
        let watcher = RegistryWatcher::new(registry(temp_dir.path()), 50)
            .await
            .unwrap();

        std::fs::write(
            temp_dir.path().join("watched.toml"),
            "[export]\nWatched = \"watched\"\n",
        )
        .unwrap();

        let mut loaded = false;
        for _ in 0..100 {
            if watcher.registry().lookup("Watched").is_some() {
                loaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(loaded, "watcher should have loaded the new unit");
    }
}
