//! Error types for the crate-build bridge.
//!
//! The hierarchy separates startup-fatal configuration problems
//! (`ConfigError`) from recoverable build-time failures (`BridgeError`).
//! A failed build or a missing toolchain is reported and the previously
//! registered artifact, if any, keeps serving; only invalid
//! configuration aborts initialization.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors. All of these are fatal at plugin init.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// Root directory doesn't exist or is not a directory
    #[error("Crate root directory not found: {}", .0.display())]
    #[diagnostic(
        code(crateport::config::root_not_found),
        help("Check the 'root' option; it must point at the directory containing your crates")
    )]
    RootNotFound(PathBuf),

    /// No crates listed in the configuration
    #[error("No crates configured")]
    #[diagnostic(
        code(crateport::config::empty_crate_list),
        help("Add at least one crate name to the 'crates' list")
    )]
    EmptyCrateList,

    /// A listed crate has no source directory under the root
    #[error("Crate '{name}' has no source directory at {}", .dir.display())]
    #[diagnostic(
        code(crateport::config::crate_dir_missing),
        help("Each entry in 'crates' must match a subdirectory of the root")
    )]
    CrateDirMissing {
        /// Crate name as listed in the configuration
        name: String,
        /// Directory that was expected to exist
        dir: PathBuf,
    },

    /// Config file has invalid JSON syntax
    #[error("Invalid JSON in config file: {0}")]
    #[diagnostic(
        code(crateport::config::invalid_json),
        help("Use a JSON validator to check syntax")
    )]
    InvalidJson(#[from] serde_json::Error),

    /// I/O error while reading the config file
    #[error("Failed to read config file: {0}")]
    #[diagnostic(code(crateport::config::io))]
    Io(#[from] std::io::Error),
}

/// Errors produced by the bridge at build and watch time.
#[derive(Error, Debug, Diagnostic)]
pub enum BridgeError {
    /// Invalid configuration (fatal at startup)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// Toolchain binary not found in PATH
    #[error("Toolchain '{command}' not found in PATH")]
    #[diagnostic(
        code(crateport::toolchain::not_found),
        help("Install the toolchain or set the 'cli' option to its full path")
    )]
    ToolchainNotFound {
        /// The command that could not be resolved
        command: String,
    },

    /// Failed to spawn the toolchain process
    #[error("Failed to spawn toolchain process: {source}")]
    #[diagnostic(
        code(crateport::toolchain::spawn_failed),
        help("Check that the toolchain is installed and permissions are correct")
    )]
    SpawnFailed {
        #[source]
        source: std::io::Error,
    },

    /// Toolchain exited with non-zero status for a crate
    #[error("Build of crate '{krate}' failed with exit code {exit_code}")]
    #[diagnostic(code(crateport::build::failed))]
    BuildFailed {
        /// Crate whose build failed
        krate: String,
        /// Toolchain exit code
        exit_code: i32,
        /// Captured toolchain stderr
        #[help]
        stderr: String,
    },

    /// Toolchain process exceeded the configured timeout
    #[error("Build of crate '{krate}' timed out after {timeout_secs} seconds")]
    #[diagnostic(
        code(crateport::build::timeout),
        help("Increase 'timeout_secs' or check if the toolchain is stuck")
    )]
    Timeout {
        /// Crate whose build timed out
        krate: String,
        /// Timeout that was exceeded
        timeout_secs: u64,
    },

    /// Build reported success but no loader stub was produced
    #[error("Build of crate '{krate}' produced no loader stub at {}", .expected.display())]
    #[diagnostic(
        code(crateport::build::artifact_missing),
        help("The toolchain exited cleanly but its output layout was not recognized")
    )]
    ArtifactMissing {
        /// Crate whose artifact is missing
        krate: String,
        /// Path where the loader stub was expected
        expected: PathBuf,
    },

    /// Filesystem watch could not be established
    #[error("File watcher error: {0}")]
    #[diagnostic(
        code(crateport::watch::setup_failed),
        help("Live rebuilds are disabled; builds still run once at startup")
    )]
    Watch(#[from] notify::Error),

    /// I/O errors from filesystem operations
    #[error("I/O error: {0}")]
    #[diagnostic(code(crateport::io))]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// True for errors the dev loop reports and survives: the previous
    /// artifact (if any) stays registered and the loop keeps running.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BridgeError::Config(_))
    }
}

/// Result type alias using `BridgeError` as the default error type.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
