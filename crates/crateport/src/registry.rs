//! Module registration map shared between build handlers and the
//! resolve hook.
//!
//! One slot exists per configured crate from init onward; a slot holds
//! no artifact until the first successful build. Only build-completion
//! handlers write entries, so a failed rebuild leaves the previous
//! artifact in place and the dev server keeps serving the last good
//! output.

use crate::toolchain::Artifact;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::PathBuf;

/// One registered crate: its source directory plus the artifact of the
/// most recent successful build, if any.
#[derive(Debug, Clone)]
struct ModuleEntry {
    crate_dir: PathBuf,
    artifact: Option<Artifact>,
}

/// Import-specifier to artifact map.
///
/// Read by the resolve hook, written only on successful build
/// completion. Thread-safe so concurrent crate builds can record their
/// results while resolution continues.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: RwLock<FxHashMap<String, ModuleEntry>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate slot for a crate at init.
    ///
    /// The slot stays empty until the first successful build records an
    /// artifact. Re-registering an existing slot keeps its artifact.
    pub fn register_slot(&self, name: &str, crate_dir: PathBuf) {
        self.entries
            .write()
            .entry(name.to_string())
            .or_insert(ModuleEntry {
                crate_dir,
                artifact: None,
            });
    }

    /// Record a successful build.
    ///
    /// Overwrites any previous artifact for the crate. Failed builds
    /// must not call this; stale entries persist by design.
    pub fn record(&self, name: &str, artifact: Artifact) {
        if let Some(entry) = self.entries.write().get_mut(name) {
            entry.artifact = Some(artifact);
        } else {
            tracing::warn!("[crateport] recording artifact for unregistered crate '{}'", name);
        }
    }

    /// Resolve an import specifier to an artifact file path.
    ///
    /// The crate name itself resolves to the loader stub; a
    /// `name/<subpath>` specifier resolves inside the built output
    /// directory. Unknown specifiers, and known crates without a
    /// successful build yet, return `None` so the next resolver runs.
    pub fn resolve(&self, specifier: &str) -> Option<PathBuf> {
        let entries = self.entries.read();

        if let Some(entry) = entries.get(specifier) {
            return entry.artifact.as_ref().map(|a| a.loader.clone());
        }

        // Subpath imports like "hello/hello_bg.wasm"
        let (name, subpath) = specifier.split_once('/')?;
        let artifact = entries.get(name)?.artifact.as_ref()?;
        Some(artifact.pkg_dir.join(subpath))
    }

    /// Whether a crate has a recorded artifact.
    pub fn has_artifact(&self, name: &str) -> bool {
        self.entries
            .read()
            .get(name)
            .is_some_and(|e| e.artifact.is_some())
    }

    /// Source directory for a registered crate.
    pub fn crate_dir(&self, name: &str) -> Option<PathBuf> {
        self.entries.read().get(name).map(|e| e.crate_dir.clone())
    }

    /// Number of registered slots.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no slots are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
