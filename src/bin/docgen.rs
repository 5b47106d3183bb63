//! docgen CLI Binary
//!
//! Command-line interface for batch document generation.

use anyhow::Context;
use clap::Parser;
use docgen::cli::{command_name, map_error, Cli, Commands, RunContext};
use docgen::config::ConfigLoader;
use docgen::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!("Command failed: {:#}", e);
        match e.downcast_ref::<docgen::error::ApiError>() {
            Some(api_error) => eprintln!("{}", map_error(api_error)),
            None => eprintln!("{:#}", e),
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = command_name(&cli.command);
    info!(command, "docgen starting");

    let context = RunContext::new(cli.workspace.clone(), cli.config.clone(), cli.store.clone())
        .context("Failed to initialize docgen")?;
    let output = context.execute(&cli.command).await?;

    match cli.command {
        // stdout carries the NDJSON stream; the summary goes to stderr.
        Commands::Generate { .. } => eprintln!("{}", output),
        _ => println!("{}", output),
    }
    info!(command, "Command completed successfully");
    Ok(())
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let loaded = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path),
        None => ConfigLoader::load(&cli.workspace),
    };
    let mut config = loaded.map(|c| c.logging).unwrap_or_default();

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

    // Never interleave logs with the NDJSON stream.
    if matches!(cli.command, Commands::Generate { .. }) && config.output == "stdout" {
        config.output = "stderr".to_string();
    }

    config
}
