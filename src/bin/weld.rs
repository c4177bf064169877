//! weld CLI binary

use anyhow::Context;
use clap::Parser;
use std::process;
use tracing::{error, info};
use weld::cli::{Cli, CommandRunner};
use weld::config::{ConfigLoader, WeldConfig};
use weld::logging::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }
    info!(workspace = %cli.workspace.display(), "weld starting");

    let runner = CommandRunner::new(cli.workspace.clone(), config);
    match runner.execute(&cli.command).await {
        Ok(output) => {
            println!("{}", output.text);
            if output.exit_code != 0 {
                process::exit(output.exit_code);
            }
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{}", weld::cli::map_error(&e));
            process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<WeldConfig> {
    let config = ConfigLoader::load_validated(&cli.workspace, cli.config.as_deref())
        .with_context(|| match &cli.config {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => format!(
                "Failed to load configuration for workspace {}",
                cli.workspace.display()
            ),
        })?;
    Ok(config)
}

/// Precedence: CLI flags over the loaded config (env overrides apply inside `init_logging`).
fn build_logging_config(cli: &Cli, config: &WeldConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();
    if cli.quiet {
        logging.enabled = false;
    }
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        logging.output = output.clone();
    }
    if let Some(file) = &cli.log_file {
        logging.file = file.clone();
        if cli.log_output.is_none() {
            logging.output = "file".to_string();
        }
    }
    if logging.file.is_relative() {
        logging.file = cli.workspace.join(&logging.file);
    }
    logging
}
