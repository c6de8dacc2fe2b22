//! Per-crate build state tracking.
//!
//! Each configured crate moves through `Pending → Building →
//! {Succeeded, Failed}` and re-enters `Building` on the next watched
//! change. The task set enforces one build in flight per crate: a
//! change arriving mid-build coalesces into a single queued rebuild
//! that is drained when the running build completes.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::time::Instant;

/// Build status of one crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    /// No build has run yet
    Pending,
    /// A toolchain invocation is in flight
    Building {
        /// When the invocation started
        started_at: Instant,
    },
    /// Last build completed successfully
    Succeeded {
        /// Duration of the last build in milliseconds
        duration_ms: u64,
    },
    /// Last build failed
    Failed {
        /// Rendered error message
        error: String,
    },
}

impl BuildState {
    /// Check if a build is currently running.
    pub fn is_building(&self) -> bool {
        matches!(self, BuildState::Building { .. })
    }

    /// Check if the last build succeeded.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, BuildState::Succeeded { .. })
    }

    /// Get the error message if the last build failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildState::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// One crate's task record.
#[derive(Debug, Clone)]
pub struct CrateTask {
    /// Crate name as configured
    pub name: String,
    /// Source directory of the crate
    pub dir: PathBuf,
    /// Current build state
    pub state: BuildState,
    /// A change arrived while building; rebuild once after completion
    pub rebuild_queued: bool,
}

/// Task records for all configured crates.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: RwLock<FxHashMap<String, CrateTask>>,
}

impl TaskSet {
    /// Create an empty task set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a crate task in the `Pending` state.
    pub fn register(&self, name: &str, dir: PathBuf) {
        self.tasks
            .write()
            .entry(name.to_string())
            .or_insert(CrateTask {
                name: name.to_string(),
                dir,
                state: BuildState::Pending,
                rebuild_queued: false,
            });
    }

    /// Try to move a crate into the `Building` state.
    ///
    /// Returns `true` if the caller may start a build now. If a build
    /// is already in flight the request is coalesced into a single
    /// queued rebuild and `false` is returned. Unknown crates return
    /// `false`.
    pub fn begin(&self, name: &str) -> bool {
        let mut tasks = self.tasks.write();
        let Some(task) = tasks.get_mut(name) else {
            return false;
        };

        if task.state.is_building() {
            task.rebuild_queued = true;
            return false;
        }

        task.state = BuildState::Building {
            started_at: Instant::now(),
        };
        true
    }

    /// Record a successful build.
    ///
    /// Returns `true` if a rebuild was queued while this build ran; the
    /// queue flag is cleared either way.
    pub fn finish_success(&self, name: &str, duration_ms: u64) -> bool {
        self.finish(name, BuildState::Succeeded { duration_ms })
    }

    /// Record a failed build.
    ///
    /// Returns `true` if a rebuild was queued while this build ran.
    pub fn finish_failure(&self, name: &str, error: String) -> bool {
        self.finish(name, BuildState::Failed { error })
    }

    fn finish(&self, name: &str, state: BuildState) -> bool {
        let mut tasks = self.tasks.write();
        let Some(task) = tasks.get_mut(name) else {
            return false;
        };
        task.state = state;
        std::mem::take(&mut task.rebuild_queued)
    }

    /// Current state of a crate.
    pub fn state(&self, name: &str) -> Option<BuildState> {
        self.tasks.read().get(name).map(|t| t.state.clone())
    }

    /// Source directory of a crate.
    pub fn dir(&self, name: &str) -> Option<PathBuf> {
        self.tasks.read().get(name).map(|t| t.dir.clone())
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// Whether no tasks are registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}
