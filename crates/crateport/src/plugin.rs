//! Bundler lifecycle hooks and the bridge plugin implementation.
//!
//! The host bundler drives the plugin through the [`BundlerHooks`]
//! interface: `init` once at startup, `build` once per crate, `resolve`
//! whenever an import specifier needs resolution, and `watch` in dev
//! mode. The plugin is an explicit value constructed from a
//! [`BridgeConfig`]; there is no ambient registration state.

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::registry::ModuleRegistry;
use crate::task::TaskSet;
use crate::toolchain::Toolchain;
use crate::watch::{BridgeWatcher, CrateChange};
use async_trait::async_trait;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Lifecycle hooks consumed by the host bundler.
#[async_trait]
pub trait BundlerHooks: Send + Sync {
    /// Plugin name for diagnostics and logging.
    fn name(&self) -> Cow<'static, str>;

    /// Validate configuration and register one module slot per crate.
    ///
    /// Called once at bundler startup. Errors here are fatal.
    async fn init(&self) -> Result<()>;

    /// Resolve an import specifier to an artifact path.
    ///
    /// Returns `None` for specifiers this plugin does not own, or for
    /// crates without a successful build yet, so the bundler's next
    /// resolver runs.
    async fn resolve(&self, specifier: &str) -> Option<PathBuf>;

    /// Build one crate through the external toolchain.
    ///
    /// Invoked once per crate at startup and again on watched changes.
    async fn build(&self, krate: &str) -> Result<()>;

    /// Subscribe to filesystem changes under the crate directories.
    ///
    /// Dev mode only. On error, callers degrade to build-once mode.
    async fn watch(&self) -> Result<mpsc::Receiver<CrateChange>>;
}

/// The crate-build bridge plugin.
///
/// Cheap to clone; clones share the registry, task set, and watcher so
/// concurrent builds coordinate through the same state.
#[derive(Clone)]
pub struct CrateBridgePlugin {
    config: Arc<BridgeConfig>,
    toolchain: Toolchain,
    registry: Arc<ModuleRegistry>,
    tasks: Arc<TaskSet>,
    /// Keeps the notify watcher alive for the dev session
    watcher: Arc<parking_lot::Mutex<Option<BridgeWatcher>>>,
}

impl CrateBridgePlugin {
    /// Create a plugin from its configuration.
    ///
    /// Validation is deferred to [`BundlerHooks::init`] so construction
    /// itself cannot fail.
    pub fn new(config: BridgeConfig) -> Self {
        let toolchain = Toolchain::from_config(&config);
        Self {
            config: Arc::new(config),
            toolchain,
            registry: Arc::new(ModuleRegistry::new()),
            tasks: Arc::new(TaskSet::new()),
            watcher: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    /// The plugin configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The shared module registry.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The shared task set.
    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    /// Check that the configured toolchain is resolvable on the host.
    pub async fn check_toolchain(&self) -> Result<()> {
        self.toolchain.ensure_available().await
    }

    /// Build every configured crate, concurrently across crates.
    ///
    /// Each crate's own build sequence stays strictly ordered through
    /// the task set. Failures are logged per crate and the first error
    /// is returned after all builds have finished; a failure for one
    /// crate never aborts the others.
    pub async fn build_all(&self) -> Result<()> {
        let mut joins = tokio::task::JoinSet::new();

        for name in &self.config.crates {
            let plugin = self.clone();
            let name = name.clone();
            joins.spawn(async move { plugin.build(&name).await });
        }

        let mut first_err = None;
        while let Some(joined) = joins.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
                Err(join_err) => {
                    error!("[crateport] build task panicked: {}", join_err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BundlerHooks for CrateBridgePlugin {
    fn name(&self) -> Cow<'static, str> {
        "crateport".into()
    }

    async fn init(&self) -> Result<()> {
        self.config.validate()?;

        for name in &self.config.crates {
            let dir = self.config.crate_dir(name);
            self.registry.register_slot(name, dir.clone());
            self.tasks.register(name, dir);
        }

        debug!(
            "[crateport] initialized with {} crate(s) under {}",
            self.registry.len(),
            self.config.root.display()
        );
        Ok(())
    }

    async fn resolve(&self, specifier: &str) -> Option<PathBuf> {
        self.registry.resolve(specifier)
    }

    async fn build(&self, krate: &str) -> Result<()> {
        let Some(dir) = self.tasks.dir(krate) else {
            warn!("[crateport] ignoring build request for unknown crate '{}'", krate);
            return Ok(());
        };

        // A build already in flight coalesces this request into one
        // queued rebuild; the running build drains it on completion.
        if !self.tasks.begin(krate) {
            debug!("[crateport] build of '{}' already in flight, rebuild queued", krate);
            return Ok(());
        }

        let mut result = Ok(());
        loop {
            let start = Instant::now();
            let queued = match self.toolchain.build(krate, &dir).await {
                Ok(artifact) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    info!(
                        "[crateport] built '{}' in {}ms ({})",
                        krate,
                        duration_ms,
                        artifact.loader.display()
                    );
                    // Only successful builds write the registry; a
                    // failed rebuild keeps serving the last good artifact
                    self.registry.record(krate, artifact);
                    result = Ok(());
                    self.tasks.finish_success(krate, duration_ms)
                }
                Err(err) => {
                    error!("[crateport] build of '{}' failed: {}", krate, err);
                    let queued = self.tasks.finish_failure(krate, err.to_string());
                    result = Err(err);
                    queued
                }
            };

            if queued && self.tasks.begin(krate) {
                debug!("[crateport] draining queued rebuild for '{}'", krate);
                continue;
            }
            break;
        }

        result
    }

    async fn watch(&self) -> Result<mpsc::Receiver<CrateChange>> {
        let roots: Vec<(String, PathBuf)> = self
            .config
            .crates
            .iter()
            .map(|name| (name.clone(), self.config.crate_dir(name)))
            .collect();

        let (watcher, rx) = BridgeWatcher::new(roots, self.config.debounce_ms)?;
        *self.watcher.lock() = Some(watcher);
        Ok(rx)
    }
}

/// Consume watcher events and rebuild the affected crates.
///
/// Runs until the change channel closes. Each change spawns the
/// crate's build on the runtime; the task set guarantees one build in
/// flight per crate and coalesces changes arriving mid-build, so
/// spawning here cannot start overlapping builds. Build failures are
/// logged and the loop keeps running.
pub async fn run_dev_loop(plugin: CrateBridgePlugin, mut changes: mpsc::Receiver<CrateChange>) {
    while let Some(change) = changes.recv().await {
        info!(
            "[crateport] change in '{}': {}",
            change.krate,
            change.path.display()
        );
        let plugin = plugin.clone();
        tokio::spawn(async move {
            // Errors are reported inside build; the prior artifact stays registered
            let _ = plugin.build(&change.krate).await;
        });
    }
    debug!("[crateport] watch channel closed, dev loop exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BridgeError, ConfigError};
    use crate::task::BuildState;

    fn fixture(crates: &[&str]) -> (tempfile::TempDir, BridgeConfig) {
        let dir = tempfile::tempdir().unwrap();
        for name in crates {
            std::fs::create_dir_all(dir.path().join(name).join("src")).unwrap();
        }
        let config = BridgeConfig::new(
            dir.path(),
            crates.iter().map(|s| s.to_string()).collect(),
        );
        (dir, config)
    }

    #[test]
    fn test_plugin_name() {
        let plugin = CrateBridgePlugin::new(BridgeConfig::default());
        assert_eq!(plugin.name(), "crateport");
    }

    #[tokio::test]
    async fn test_init_registers_one_slot_per_crate() {
        let (_dir, config) = fixture(&["hello", "world"]);
        let plugin = CrateBridgePlugin::new(config);

        plugin.init().await.unwrap();

        assert_eq!(plugin.registry().len(), 2);
        assert_eq!(plugin.tasks().len(), 2);
        assert_eq!(plugin.tasks().state("hello"), Some(BuildState::Pending));
        // Slots are empty until the first successful build
        assert_eq!(plugin.resolve("hello").await, None);
        assert_eq!(plugin.resolve("world").await, None);
    }

    #[tokio::test]
    async fn test_init_rejects_empty_crate_list() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = CrateBridgePlugin::new(BridgeConfig::new(dir.path(), Vec::new()));

        let err = plugin.init().await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Config(ConfigError::EmptyCrateList)
        ));
    }

    #[tokio::test]
    async fn test_missing_toolchain_is_reported_and_nonfatal() {
        let (_dir, config) = fixture(&["hello"]);
        let config = config.with_cli("crateport-test-no-such-binary");
        let plugin = CrateBridgePlugin::new(config);
        plugin.init().await.unwrap();

        let err = plugin.build("hello").await.unwrap_err();
        assert!(matches!(err, BridgeError::ToolchainNotFound { .. }));
        assert!(err.is_recoverable());

        // No prior artifact: resolution stays unresolved
        assert_eq!(plugin.resolve("hello").await, None);
        assert!(plugin.tasks().state("hello").unwrap().error().is_some());
    }

    #[tokio::test]
    async fn test_build_unknown_crate_is_ignored() {
        let (_dir, config) = fixture(&["hello"]);
        let plugin = CrateBridgePlugin::new(config);
        plugin.init().await.unwrap();

        assert!(plugin.build("nope").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_defers_for_foreign_specifiers() {
        let (_dir, config) = fixture(&["hello"]);
        let plugin = CrateBridgePlugin::new(config);
        plugin.init().await.unwrap();

        assert_eq!(plugin.resolve("lodash").await, None);
    }

    #[tokio::test]
    async fn test_watch_delivers_changes_for_registered_crates() {
        let (dir, config) = fixture(&["hello"]);
        let plugin = CrateBridgePlugin::new(config.with_debounce_ms(50));
        plugin.init().await.unwrap();

        let mut rx = plugin.watch().await.unwrap();
        std::fs::write(dir.path().join("hello/src/lib.rs"), "pub fn f() {}").unwrap();

        let change = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher should deliver an event")
            .expect("channel open");
        assert_eq!(change.krate, "hello");
    }

    #[tokio::test]
    async fn test_watch_setup_failure_is_recoverable() {
        let (dir, config) = fixture(&["hello"]);
        // Remove the crate dir after init so watch setup fails
        let plugin = CrateBridgePlugin::new(config);
        plugin.init().await.unwrap();
        std::fs::remove_dir_all(dir.path().join("hello")).unwrap();

        let err = plugin.watch().await.unwrap_err();
        assert!(matches!(err, BridgeError::Watch(_)));
        assert!(err.is_recoverable());
    }
}
