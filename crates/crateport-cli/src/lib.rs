//! Crateport CLI - build and watch Rust crates as web-loadable modules.
//!
//! Exposes the [`crateport`] bridge through a small command-line
//! surface:
//!
//! - `crateport build` - one-shot build of all configured crates
//! - `crateport dev` - initial build plus watch/rebuild loop
//! - `crateport check` - validate configuration and toolchain

pub mod cli;
pub mod commands;
pub mod logger;
