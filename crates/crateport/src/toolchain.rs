//! External toolchain integration for building crates.
//!
//! The bridge never compiles anything itself; it shells out to the
//! configured toolchain (e.g. `wasm-pack`) once per crate and inspects
//! the output layout afterwards. Builds run as child processes so the
//! host bundler's event loop is never blocked while a compile is in
//! flight.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

/// Name of the output directory the toolchain produces inside a crate.
pub const PKG_DIR: &str = "pkg";

/// A compiled crate output: the directory the toolchain wrote and the
/// loader stub inside it that the bundler imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Output directory produced by the toolchain
    pub pkg_dir: PathBuf,
    /// JS loader stub that wraps the binary module
    pub loader: PathBuf,
}

/// Runner for the external toolchain command.
///
/// Holds the invocation shape derived from the configuration; one
/// instance is shared by all crate builds.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Toolchain executable name or path
    command: String,
    /// Build with the release profile
    release: bool,
    /// Extra arguments appended to every invocation
    extra_args: Vec<String>,
    /// Timeout for a single invocation in seconds
    timeout_secs: u64,
}

impl Toolchain {
    /// Create a runner from the bridge configuration.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            command: config.cli.clone(),
            release: config.release,
            extra_args: config.cli_args.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// The configured toolchain command.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Check that the toolchain binary is resolvable on the host.
    ///
    /// # Errors
    ///
    /// Returns `ToolchainNotFound` if the binary is not in PATH.
    pub async fn ensure_available(&self) -> Result<()> {
        #[cfg(unix)]
        let check_cmd = "which";
        #[cfg(windows)]
        let check_cmd = "where";

        let status = Command::new(check_cmd)
            .arg(&self.command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| BridgeError::SpawnFailed { source })?;

        if !status.success() {
            return Err(BridgeError::ToolchainNotFound {
                command: self.command.clone(),
            });
        }

        Ok(())
    }

    /// Argument vector for building one crate, excluding the executable.
    fn build_args(&self, crate_dir: &Path) -> Vec<String> {
        let mut args = vec!["build".to_string(), crate_dir.display().to_string()];
        if self.release {
            args.push("--release".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Build one crate by invoking the toolchain.
    ///
    /// Spawns `{cli} build <crate_dir> [--release] [extra args…]`,
    /// waits for completion under the configured timeout, and locates
    /// the loader stub the toolchain wrote under `<crate_dir>/pkg/`.
    ///
    /// # Errors
    ///
    /// - `ToolchainNotFound` if the command cannot be spawned because
    ///   the binary does not exist
    /// - `BuildFailed` with the captured stderr on non-zero exit
    /// - `Timeout` if the invocation exceeds the configured limit
    /// - `ArtifactMissing` if the build exited cleanly but produced no
    ///   recognizable loader stub
    pub async fn build(&self, name: &str, crate_dir: &Path) -> Result<Artifact> {
        let mut cmd = Command::new(&self.command);
        cmd.args(self.build_args(crate_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out toolchain must not outlive the build request
            .kill_on_drop(true);

        tracing::debug!("[crateport] building '{}' with {}", name, self.command);

        let child = cmd.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                BridgeError::ToolchainNotFound {
                    command: self.command.clone(),
                }
            } else {
                BridgeError::SpawnFailed { source }
            }
        })?;

        let output = timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| BridgeError::Timeout {
            krate: name.to_string(),
            timeout_secs: self.timeout_secs,
        })?
        .map_err(|source| BridgeError::SpawnFailed { source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(BridgeError::BuildFailed {
                krate: name.to_string(),
                exit_code,
                stderr,
            });
        }

        locate_artifact(name, crate_dir)
    }
}

/// Locate the loader stub for a crate after a successful build.
///
/// The toolchain writes its output to `<crate_dir>/pkg/`. The loader
/// stub is whatever `pkg/package.json` names in its `module` field,
/// falling back to `<crate_name_snake_case>.js` when there is no
/// package manifest.
pub fn locate_artifact(name: &str, crate_dir: &Path) -> Result<Artifact> {
    let pkg_dir = crate_dir.join(PKG_DIR);

    let loader = loader_from_manifest(&pkg_dir)
        .unwrap_or_else(|| pkg_dir.join(format!("{}.js", name.replace('-', "_"))));

    if !loader.is_file() {
        return Err(BridgeError::ArtifactMissing {
            krate: name.to_string(),
            expected: loader,
        });
    }

    Ok(Artifact { pkg_dir, loader })
}

/// Read the `module` entry point from `pkg/package.json`, if present.
fn loader_from_manifest(pkg_dir: &Path) -> Option<PathBuf> {
    let content = std::fs::read_to_string(pkg_dir.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&content).ok()?;
    let module = manifest.get("module")?.as_str()?;
    Some(pkg_dir.join(module))
}
