//! Command-line interface definition for Crateport.
//!
//! Defined with clap v4's derive macros. Every subcommand reads the
//! same configuration surface: a JSON config file plus flag overrides
//! for the toolchain command, crate root, and crate list.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "crateport.config.json";

/// Crateport - bridge Rust crates into a web bundler
#[derive(Parser, Debug)]
#[command(
    name = "crateport",
    version,
    about = "Compile Rust crates to web-loadable modules and keep them fresh",
    long_about = "Crateport invokes an external toolchain (wasm-pack by default) to\n\
                  compile each configured crate into a web-loadable module, and in dev\n\
                  mode watches crate sources and rebuilds on change."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available Crateport subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build all configured crates once
    Build(BuildArgs),

    /// Build, then watch crate sources and rebuild on change
    Dev(DevArgs),

    /// Validate configuration and toolchain availability
    Check(CheckArgs),
}

/// Configuration surface shared by all subcommands.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to the JSON config file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Toolchain command used to build each crate (overrides config)
    #[arg(long, value_name = "COMMAND")]
    pub cli: Option<String>,

    /// Directory containing crate subdirectories (overrides config)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Crate to build (repeatable; overrides the config list)
    #[arg(long = "crate", value_name = "NAME")]
    pub crates: Vec<String>,
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Build with the toolchain's release profile
    #[arg(long)]
    pub release: bool,
}

/// Arguments for the dev command
#[derive(Args, Debug)]
pub struct DevArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Debounce window for change events in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}
