//! Logging setup for the Crateport CLI.
//!
//! Structured logging via the `tracing` ecosystem with verbosity flags
//! and a `RUST_LOG` escape hatch.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with the specified options.
///
/// Called once at startup, before any logging occurs.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging (overrides `quiet`)
/// * `quiet` - Only show error-level logs
/// * `no_color` - Disable colored output
///
/// The level is chosen in order: `--verbose`, `--quiet`, the `RUST_LOG`
/// environment variable, then an info-level default.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("crateport=debug,crateport_cli=debug")
    } else if quiet {
        EnvFilter::new("crateport=error,crateport_cli=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("crateport=info,crateport_cli=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Check if colored output should be enabled.
///
/// Respects the `NO_COLOR` and `FORCE_COLOR` conventions, then falls
/// back to terminal capability detection.
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::Term::stdout().features().colors_supported()
}
