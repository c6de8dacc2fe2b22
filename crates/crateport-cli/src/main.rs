//! Crateport CLI entry point.
//!
//! Handles argument parsing, logging initialization, and command
//! dispatch; bridge errors are rendered as miette diagnostics.

use clap::Parser;
use crateport_cli::{cli, commands, logger};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args).await,
        cli::Command::Check(check_args) => commands::check_execute(check_args).await,
    };

    result.map_err(miette::Report::new)
}
