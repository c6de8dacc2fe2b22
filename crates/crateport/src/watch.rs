//! Filesystem watcher with per-crate debouncing for development mode.
//!
//! Watches each configured crate's source directory and forwards
//! change events over a channel, attributed to the owning crate.
//! Events for one crate are debounced on the trailing edge: the first
//! change opens a window and a single event is emitted when the window
//! closes, so rapid successive writes trigger one rebuild and a write
//! landing late in the window is still part of it. Build output
//! (`target/`, `pkg/`) and hidden files are filtered out so a finished
//! build does not immediately retrigger itself.

use crate::error::Result;
use crate::toolchain::PKG_DIR;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// A debounced change event attributed to one crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrateChange {
    /// Crate whose sources changed
    pub krate: String,
    /// Path that changed
    pub path: PathBuf,
}

/// File watcher over the configured crate directories.
///
/// Dropping the watcher stops event delivery; keep it alive for the
/// lifetime of the dev session.
pub struct BridgeWatcher {
    /// Underlying notify watcher
    _watcher: RecommendedWatcher,
    /// Watched crate roots as configured, by crate name
    roots: Vec<(String, PathBuf)>,
}

impl BridgeWatcher {
    /// Watch the given crate directories.
    ///
    /// Must be called from within a Tokio runtime; the debouncer runs
    /// as a background task that exits when the watcher is dropped.
    ///
    /// # Arguments
    ///
    /// * `crates` - `(name, source directory)` pairs to watch
    /// * `debounce_ms` - per-crate debounce window in milliseconds
    ///
    /// # Returns
    ///
    /// The watcher plus a receiver of debounced change events.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Watch` if a directory cannot be resolved
    /// or watched. Callers degrade to build-once mode on this error
    /// instead of aborting the dev session.
    pub fn new(
        crates: Vec<(String, PathBuf)>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<CrateChange>)> {
        // notify reports canonicalized absolute event paths; the
        // config-derived roots may be relative, so canonicalize them
        // before watching and before any prefix comparison
        let mut watched: Vec<(String, PathBuf)> = Vec::with_capacity(crates.len());
        for (name, dir) in &crates {
            let canonical = dir.canonicalize().map_err(notify::Error::io)?;
            watched.push((name.clone(), canonical));
        }

        let (raw_tx, raw_rx) = mpsc::channel(256);
        let roots_for_events = watched.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };

            if !is_relevant_kind(&event.kind) {
                return;
            }

            for path in &event.paths {
                let Some(krate) = crate_for_path(path, &roots_for_events) else {
                    continue;
                };

                if should_ignore(path, &roots_for_events) {
                    continue;
                }

                let _ = raw_tx.blocking_send(CrateChange {
                    krate,
                    path: path.clone(),
                });
            }
        })?;

        for (_, dir) in &watched {
            watcher.watch(dir, RecursiveMode::Recursive)?;
        }

        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(debounce_loop(
            raw_rx,
            tx,
            Duration::from_millis(debounce_ms),
        ));

        Ok((
            Self {
                _watcher: watcher,
                roots: crates,
            },
            rx,
        ))
    }

    /// The watched crate roots.
    pub fn roots(&self) -> &[(String, PathBuf)] {
        &self.roots
    }
}

/// Trailing-edge debouncer between raw notify events and the bridge.
///
/// The first event for a crate opens a window; one event per crate is
/// forwarded when its window closes, carrying the most recent path.
/// Exits when the raw channel closes (watcher dropped) or the consumer
/// goes away.
async fn debounce_loop(
    mut raw: mpsc::Receiver<CrateChange>,
    tx: mpsc::Sender<CrateChange>,
    window: Duration,
) {
    let mut pending: FxHashMap<String, (CrateChange, Instant)> = FxHashMap::default();

    loop {
        let next_due = pending.values().map(|(_, due)| *due).min();

        tokio::select! {
            maybe = raw.recv() => match maybe {
                Some(change) => {
                    let due = Instant::now() + window;
                    pending
                        .entry(change.krate.clone())
                        // Window stays anchored at the first event;
                        // later ones only refresh the reported path
                        .and_modify(|(c, _)| c.path = change.path.clone())
                        .or_insert((change, due));
                }
                None => break,
            },
            () = async { sleep_until(next_due.unwrap()).await }, if next_due.is_some() => {
                let now = Instant::now();
                let due: Vec<String> = pending
                    .iter()
                    .filter(|(_, (_, due))| *due <= now)
                    .map(|(krate, _)| krate.clone())
                    .collect();
                for krate in due {
                    if let Some((change, _)) = pending.remove(&krate) {
                        if tx.send(change).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }

    // Watcher dropped mid-window: flush what's left
    for (_, (change, _)) in pending.drain() {
        let _ = tx.send(change).await;
    }
}

/// Only creates, modifications, and removals trigger rebuilds.
fn is_relevant_kind(kind: &notify::EventKind) -> bool {
    matches!(
        kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
    )
}

/// Attribute a changed path to the crate whose root contains it.
fn crate_for_path(path: &Path, roots: &[(String, PathBuf)]) -> Option<String> {
    roots
        .iter()
        .filter(|(_, dir)| path.starts_with(dir))
        .max_by_key(|(_, dir)| dir.components().count())
        .map(|(name, _)| name.clone())
}

/// Check if a changed path should be ignored.
///
/// Skips build output directories and hidden files so builds do not
/// retrigger themselves, and anything outside the watched roots.
fn should_ignore(path: &Path, roots: &[(String, PathBuf)]) -> bool {
    let Some(root) = roots
        .iter()
        .map(|(_, dir)| dir)
        .filter(|dir| path.starts_with(dir))
        .max_by_key(|dir| dir.components().count())
    else {
        return true;
    };

    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };

    for component in rel_path.components() {
        let Some(name) = component.as_os_str().to_str() else {
            return true;
        };
        if name == "target" || name == PKG_DIR {
            return true;
        }
        if name.starts_with('.') && name != "." && name != ".." {
            return true;
        }
    }

    false
}
