mod cli;
mod commands;
mod config;
mod plan;
mod progress;
mod resource;
#[cfg(test)]
mod testutil;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use gcloudkit::{CliRunner, GcloudCli};
use reconcile::ReconcileError;
use std::io;
use std::sync::Arc;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

/// Locate the Google Cloud CLIs once per invocation.
pub fn discover_cli() -> Result<Arc<dyn CliRunner>> {
    Ok(Arc::new(GcloudCli::discover()?))
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let outcome = match cli.command {
        Command::Deploy(args) => {
            let cfg = args.site.into_config();
            commands::deploy::run(&ctx, &cfg, &args.only, args.dry_run, args.yes)
        }
        Command::Status(args) => {
            let cfg = args.site.into_config();
            commands::status::run(&ctx, &cfg, &args.only)
        }
        Command::Verify(args) => {
            let cfg = args.site.into_config();
            commands::verify::run(&ctx, &cfg, args.grace, args.no_trigger)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "climactl", &mut io::stdout());
            Ok(())
        }
    };

    // Fatal errors terminate with a non-zero exit; precondition failures
    // also print their exact remediation commands.
    if let Err(err) = outcome {
        println!();
        ui::error(&format!("{err:#}"));
        if let Some(reconcile_err) = err.downcast_ref::<ReconcileError>() {
            ui::remediation(reconcile_err.remediation());
        }
        std::process::exit(1);
    }
}
