//! Simplify CLI Binary
//!
//! Command-line interface for stack deployments tracked in a local ledger.

use clap::Parser;
use simplify::cli::{map_error, Cli, GlobalOptions, RunContext};
use simplify::config::{ConfigLoader, LoadOptions};
use simplify::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Simplify CLI starting");

    let context = match RunContext::new(&GlobalOptions::from(&cli)) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let options = LoadOptions::new(&cli.workspace)
        .with_environment(cli.env.as_deref())
        .with_config_file(cli.config.clone());
    let mut config = ConfigLoader::load_with(&options)
        .ok()
        .map(|c| c.logging)
        .unwrap_or_default();

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = Some(if file.is_relative() {
            cli.workspace.join(file)
        } else {
            file.clone()
        });
    }

    config
}
