//! Crateport - bridge Rust crates into a web bundler's module graph.
//!
//! Given a root directory and a list of named crates, Crateport invokes
//! an external toolchain (e.g. `wasm-pack`) to compile each crate into
//! a web-loadable binary module, watches crate sources for changes in
//! development mode, and registers the compiled loader stubs so that
//! importing a crate name resolves like an ordinary module.
//!
//! ## Architecture
//!
//! ```text
//! init()  → validate config → one registry slot per crate
//! build() → toolchain child process → pkg/ artifact → registry entry
//! resolve("hello") → last successful artifact path (or defer)
//! watch() → debounced per-crate change events → rebuild, coalesced
//! ```
//!
//! A failed rebuild never clears a previously recorded artifact, so a
//! dev session keeps serving the last good build while the error is
//! reported through the bundler's diagnostics.
//!
//! ## Example
//!
//! ```rust,no_run
//! use crateport::{BridgeConfig, BundlerHooks, CrateBridgePlugin};
//!
//! # async fn example() -> crateport::Result<()> {
//! let config = BridgeConfig::new("./crates", vec!["hello".to_string()]);
//! let plugin = CrateBridgePlugin::new(config);
//!
//! plugin.init().await?;
//! plugin.build_all().await?;
//! assert!(plugin.resolve("hello").await.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod task;
pub mod toolchain;
pub mod watch;

// Re-export commonly used types
pub use config::BridgeConfig;
pub use error::{BridgeError, ConfigError, Result};
pub use plugin::{run_dev_loop, BundlerHooks, CrateBridgePlugin};
pub use registry::ModuleRegistry;
pub use task::{BuildState, CrateTask, TaskSet};
pub use toolchain::{Artifact, Toolchain};
pub use watch::{BridgeWatcher, CrateChange};
