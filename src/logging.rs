//! Logging System
//!
//! Structured logging using the `tracing` crate. Log output goes to stderr by
//! default so stdout carries only command results.

use crate::error::WeldError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stderr, stdout, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output is "file"
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Colored output (text format, terminal outputs only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(".weld/weld.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !LEVELS.contains(&self.level.as_str()) {
            return Err(format!("Invalid log level: {}", self.level));
        }
        parse_format(&self.format)?;
        parse_output(&self.output)?;
        for (module, level) in &self.modules {
            if !LEVELS.contains(&level.as_str()) {
                return Err(format!("Invalid log level for {}: {}", module, level));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Stderr,
    Stdout,
    File,
}

/// Initialize the logging system
///
/// Priority order (highest to lowest):
/// 1. CLI arguments (applied to the config before this call)
/// 2. Environment variables (WELD_LOG, WELD_LOG_FORMAT, WELD_LOG_OUTPUT, WELD_LOG_MODULES)
/// 3. Configuration file
/// 4. Defaults
///
/// A second call is a no-op, so tests may initialize freely.
pub fn init_logging(config: &LoggingConfig) -> Result<(), WeldError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let format = match std::env::var("WELD_LOG_FORMAT") {
        Ok(value) => parse_format(&value).map_err(WeldError::Config)?,
        Err(_) => parse_format(&config.format).map_err(WeldError::Config)?,
    };
    let output = match std::env::var("WELD_LOG_OUTPUT") {
        Ok(value) => parse_output(&value).map_err(WeldError::Config)?,
        Err(_) => parse_output(&config.output).map_err(WeldError::Config)?,
    };

    let writer = match output {
        Output::Stderr => BoxMakeWriter::new(std::io::stderr),
        Output::Stdout => BoxMakeWriter::new(std::io::stdout),
        Output::File => BoxMakeWriter::new(std::sync::Mutex::new(open_log_file(config)?)),
    };
    let ansi = config.color && output != Output::File;

    let subscriber = Registry::default().with(filter);
    let result = match format {
        Format::Json => subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        Format::Text => subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
    Ok(())
}

fn open_log_file(config: &LoggingConfig) -> Result<std::fs::File, WeldError> {
    if let Some(parent) = config.file.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            WeldError::Config(format!("Failed to create log directory: {}", e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .map_err(|e| {
            WeldError::Config(format!(
                "Failed to open log file {}: {}",
                config.file.display(),
                e
            ))
        })
}

/// Build the filter from WELD_LOG, else from config plus WELD_LOG_MODULES
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, WeldError> {
    if let Ok(filter) = EnvFilter::try_from_env("WELD_LOG") {
        return Ok(filter);
    }

    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.modules {
        filter = filter.add_directive(parse_directive(module, level)?);
    }

    if let Ok(modules) = std::env::var("WELD_LOG_MODULES") {
        for spec in modules.split(',').filter(|s| !s.trim().is_empty()) {
            if let Some((module, level)) = spec.split_once('=') {
                filter = filter.add_directive(parse_directive(module.trim(), level.trim())?);
            }
        }
    }

    Ok(filter)
}

fn parse_directive(
    module: &str,
    level: &str,
) -> Result<tracing_subscriber::filter::Directive, WeldError> {
    format!("{}={}", module, level)
        .parse()
        .map_err(|e| WeldError::Config(format!("Invalid log directive {}={}: {}", module, level, e)))
}

fn parse_format(value: &str) -> Result<Format, String> {
    match value {
        "text" => Ok(Format::Text),
        "json" => Ok(Format::Json),
        other => Err(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        )),
    }
}

fn parse_output(value: &str) -> Result<Output, String> {
    match value {
        "stderr" => Ok(Output::Stderr),
        "stdout" => Ok(Output::Stdout),
        "file" => Ok(Output::File),
        other => Err(format!(
            "Invalid log output: {} (must be 'stderr', 'stdout' or 'file')",
            other
        )),
    }
}
