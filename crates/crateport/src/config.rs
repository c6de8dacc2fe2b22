//! Bridge configuration types.
//!
//! The configuration mirrors what a bundler passes to the plugin: the
//! toolchain command, the directory holding the crates, and the ordered
//! list of crate names to build and watch. It is created once at
//! startup and never mutated.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default debounce window for filesystem change events (milliseconds).
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Default timeout for a single toolchain invocation (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the crate-build bridge.
///
/// Recognized options match the bundler-side plugin surface:
///
/// - `cli`: name or path of the external toolchain invoked per crate
/// - `root`: directory containing crate subdirectories
/// - `crates`: ordered list of crate names to build and watch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Toolchain command substituted as the executable in the spawned
    /// build invocation (e.g. "wasm-pack")
    #[serde(default = "default_cli")]
    pub cli: String,

    /// Base path for resolving each crate name to a source directory
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Crate names enumerating build/watch targets and
    /// specifier-to-artifact mappings
    #[serde(default)]
    pub crates: Vec<String>,

    /// Build with the toolchain's release profile
    #[serde(default)]
    pub release: bool,

    /// Additional arguments appended to every toolchain invocation
    #[serde(default)]
    pub cli_args: Vec<String>,

    /// Debounce window for change events, per crate (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Timeout for a single toolchain invocation (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cli() -> String {
    "wasm-pack".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cli: default_cli(),
            root: default_root(),
            crates: Vec::new(),
            release: false,
            cli_args: Vec::new(),
            debounce_ms: default_debounce_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BridgeConfig {
    /// Create a configuration for the given root and crate list with
    /// default toolchain settings.
    pub fn new(root: impl Into<PathBuf>, crates: Vec<String>) -> Self {
        Self {
            root: root.into(),
            crates,
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read and
    /// `ConfigError::InvalidJson` if it is not valid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Set the toolchain command.
    pub fn with_cli(mut self, cli: impl Into<String>) -> Self {
        self.cli = cli.into();
        self
    }

    /// Enable or disable release builds.
    pub fn with_release(mut self, release: bool) -> Self {
        self.release = release;
        self
    }

    /// Append an argument to every toolchain invocation.
    pub fn with_cli_arg(mut self, arg: impl Into<String>) -> Self {
        self.cli_args.push(arg.into());
        self
    }

    /// Set the per-crate debounce window in milliseconds.
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the toolchain timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Source directory for a crate name.
    pub fn crate_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Validate the configuration at startup.
    ///
    /// Checks that the root exists and is a directory, that the crate
    /// list is non-empty, and that each listed crate has a source
    /// directory. Duplicate crate names are allowed but logged, since
    /// later entries share the registry slot of the first.
    ///
    /// # Errors
    ///
    /// Any violation is returned as a `ConfigError`; callers treat
    /// these as fatal at init.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.is_dir() {
            return Err(ConfigError::RootNotFound(self.root.clone()));
        }

        if self.crates.is_empty() {
            return Err(ConfigError::EmptyCrateList);
        }

        for name in &self.crates {
            let dir = self.crate_dir(name);
            if !dir.is_dir() {
                return Err(ConfigError::CrateDirMissing {
                    name: name.clone(),
                    dir,
                });
            }
        }

        for (i, name) in self.crates.iter().enumerate() {
            if self.crates[..i].contains(name) {
                warn!("duplicate crate '{}' in configuration", name);
            }
        }

        Ok(())
    }
}
