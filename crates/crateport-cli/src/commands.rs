//! CLI command implementations.

use crate::cli::{BuildArgs, CheckArgs, ConfigArgs, DevArgs};
use crateport::{BridgeConfig, BridgeError, BundlerHooks, CrateBridgePlugin, Result};
use console::style;
use tracing::{info, warn};

/// Load configuration from the config file, then apply flag overrides.
///
/// A missing config file is only an error when the path was given
/// explicitly; with the default path the flags alone may describe the
/// whole configuration.
fn load_config(args: &ConfigArgs) -> Result<BridgeConfig> {
    let mut config = if args.config.exists() {
        BridgeConfig::load(&args.config).map_err(BridgeError::from)?
    } else if args.config == std::path::Path::new(crate::cli::DEFAULT_CONFIG_FILE) {
        BridgeConfig::default()
    } else {
        return Err(BridgeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("config file not found: {}", args.config.display()),
        )));
    };

    if let Some(cli) = &args.cli {
        config.cli = cli.clone();
    }
    if let Some(root) = &args.root {
        config.root = root.clone();
    }
    if !args.crates.is_empty() {
        config.crates = args.crates.clone();
    }

    Ok(config)
}

/// Execute the build command: one-shot build of all configured crates.
pub async fn build_execute(args: BuildArgs) -> Result<()> {
    let config = load_config(&args.config)?.with_release(args.release);
    let plugin = CrateBridgePlugin::new(config);

    plugin.init().await?;
    plugin.build_all().await?;

    info!("built {} crate(s)", plugin.registry().len());
    Ok(())
}

/// Execute the dev command: initial build, then watch and rebuild
/// until Ctrl-C.
pub async fn dev_execute(args: DevArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(ms) = args.debounce_ms {
        config.debounce_ms = ms;
    }
    let plugin = CrateBridgePlugin::new(config);

    plugin.init().await?;

    // Initial build failures are reported but don't end the session;
    // crates that built stay resolvable, the rest resolve once fixed.
    if let Err(err) = plugin.build_all().await {
        warn!("initial build incomplete: {}", err);
    }

    match plugin.watch().await {
        Ok(changes) => {
            info!("watching {} crate(s) for changes", plugin.tasks().len());
            tokio::select! {
                () = crateport::run_dev_loop(plugin.clone(), changes) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                }
            }
        }
        Err(err @ BridgeError::Watch(_)) => {
            // Degrade to build-once mode rather than aborting the session
            warn!("{}; live rebuilds disabled", err);
            tokio::signal::ctrl_c().await.map_err(BridgeError::Io)?;
        }
        Err(err) => return Err(err),
    }

    Ok(())
}

/// Execute the check command: validate configuration and toolchain.
pub async fn check_execute(args: CheckArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    config.validate().map_err(BridgeError::from)?;
    println!(
        "{} configuration valid ({} crate(s) under {})",
        style("✓").green(),
        config.crates.len(),
        config.root.display()
    );

    let plugin = CrateBridgePlugin::new(config);
    plugin.check_toolchain().await?;
    println!(
        "{} toolchain '{}' found",
        style("✓").green(),
        plugin.config().cli
    );

    Ok(())
}
