//! CLI parse: clap types for weld. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// weld - generate and verify implementations for injected TypeScript services
#[derive(Parser, Debug)]
#[command(name = "weld")]
#[command(about = "Generate type-checked implementations for @Inject-ed TypeScript services")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (when output is file)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover injected services and generate their implementations
    Generate {
        /// Overwrite existing implementations
        #[arg(long)]
        force: bool,
        /// Model name, overriding provider and config defaults
        #[arg(long)]
        model: Option<String>,
        /// Provider name from configuration
        #[arg(long)]
        provider: Option<String>,
        /// Attempts per target, including the initial generation
        #[arg(long)]
        max_retries: Option<u32>,
        /// Only scan these source files for injected services
        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Protect files from regeneration
    Lock {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Remove files from the lock registry
    Unlock {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List locked files
    Locks,
    /// Manage the third-party documentation cache
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },
    /// Inspect configured model providers
    Provider {
        #[command(subcommand)]
        command: ProviderCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocsCommands {
    /// Index declarations of the workspace's package.json dependencies
    Index,
    /// Remove every cached entry
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ProviderCommands {
    /// List configured providers
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Check connectivity and list available models
    Test {
        /// Provider name (default provider when omitted)
        name: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_flags() {
        let cli = Cli::try_parse_from([
            "weld",
            "generate",
            "--force",
            "--model",
            "codellama",
            "--files",
            "src/app.ts",
            "src/jobs.ts",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                force,
                model,
                files,
                ..
            } => {
                assert!(force);
                assert_eq!(model.as_deref(), Some("codellama"));
                assert_eq!(files.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn lock_requires_paths() {
        assert!(Cli::try_parse_from(["weld", "lock"]).is_err());
        assert!(Cli::try_parse_from(["weld", "lock", "src/generated/AImpl.ts"]).is_ok());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["weld", "locks", "--workspace", "/tmp/ws", "-v"]).unwrap();
        assert_eq!(cli.workspace, PathBuf::from("/tmp/ws"));
        assert!(cli.verbose);
    }
}
