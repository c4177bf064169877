//! CLI route: single route table. Dispatches to domain services and presentation.

use crate::cli::parse::{Commands, DocsCommands, ProviderCommands};
use crate::cli::presentation::{
    format_docs_clear, format_docs_index, format_generate_json, format_generate_text,
    format_lock_change, format_lock_list, format_provider_list_json, format_provider_list_text,
    format_provider_test_result, ProviderTestReport,
};
use crate::config::WeldConfig;
use crate::context::RunContext;
use crate::docs::DocCache;
use crate::error::WeldError;
use crate::lock::LockRegistry;
use crate::orchestrator::{Orchestrator, RunOptions};
use crate::paths::canonicalize_path;
use crate::provider::{GenerateOptions, ProviderRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Text for stdout plus the process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self { text, exit_code: 0 }
    }
}

/// Executes commands against one workspace with an already loaded configuration.
pub struct CommandRunner {
    workspace_root: PathBuf,
    config: WeldConfig,
}

impl CommandRunner {
    pub fn new(workspace_root: PathBuf, config: WeldConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub async fn execute(&self, command: &Commands) -> Result<CommandOutput, WeldError> {
        match command {
            Commands::Generate {
                force,
                model,
                provider,
                max_retries,
                files,
                format,
            } => {
                self.generate(
                    *force,
                    model.clone(),
                    provider.as_deref(),
                    *max_retries,
                    files,
                    format,
                )
                .await
            }
            Commands::Lock { paths } => self.change_locks(paths, true),
            Commands::Unlock { paths } => self.change_locks(paths, false),
            Commands::Locks => {
                let locks = LockRegistry::load(&self.lock_manifest()?)?;
                Ok(CommandOutput::ok(format_lock_list(locks.paths())))
            }
            Commands::Docs { command } => self.docs(command),
            Commands::Provider { command } => self.provider(command).await,
        }
    }

    fn root(&self) -> Result<PathBuf, WeldError> {
        canonicalize_path(&self.workspace_root, &std::env::current_dir()?)
    }

    fn lock_manifest(&self) -> Result<PathBuf, WeldError> {
        Ok(self.config.lock_manifest(&self.root()?))
    }

    async fn generate(
        &self,
        force: bool,
        model: Option<String>,
        provider: Option<&str>,
        max_retries: Option<u32>,
        files: &[PathBuf],
        format: &str,
    ) -> Result<CommandOutput, WeldError> {
        let ctx = Arc::new(RunContext::open(&self.workspace_root, self.config.clone())?);

        let cwd = std::env::current_dir()?;
        let subset = if files.is_empty() {
            None
        } else {
            Some(
                files
                    .iter()
                    .map(|f| canonicalize_path(f, &cwd))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        };

        let generation = &ctx.config.generation;
        let report = ctx.project.discover_targets(&generation.marker, subset.as_deref());
        if !report.unresolved.is_empty() {
            warn!(
                unresolved = ?report.unresolved,
                "Some injected types could not be resolved to an interface or abstract class"
            );
        }

        let registry = ctx.providers();
        let (provider, provider_config) = registry.create_provider(provider)?;
        info!(
            provider = provider.provider_name(),
            provider_type = provider_config.provider_type.as_str(),
            targets = report.targets.len(),
            "Provider ready"
        );

        let options = RunOptions {
            force,
            files: subset,
            max_retries: max_retries.unwrap_or(generation.max_retries),
            // only flags are explicit; timeouts fall through provider settings to the global default
            generate: GenerateOptions {
                model,
                ..GenerateOptions::default()
            },
        };

        let validator = Arc::new(ctx.validator());
        let orchestrator = Orchestrator::new(ctx.clone(), Arc::from(provider), validator);
        let summary = orchestrator.run(report.targets, options).await;
        let registry_path = if summary.outcomes.is_empty() {
            None
        } else {
            Some(orchestrator.write_registry(&summary)?)
        };

        let text = if format == "json" {
            format_generate_json(&summary, registry_path.as_deref())?
        } else {
            format_generate_text(&summary, registry_path.as_deref())
        };
        Ok(CommandOutput {
            text,
            exit_code: if summary.has_errors() { 1 } else { 0 },
        })
    }

    fn change_locks(&self, paths: &[PathBuf], lock: bool) -> Result<CommandOutput, WeldError> {
        let mut locks = LockRegistry::load(&self.lock_manifest()?)?;
        let cwd = std::env::current_dir()?;
        let changed = if lock {
            locks.lock(paths, &cwd)?
        } else {
            locks.unlock(paths, &cwd)?
        };
        let verb = if lock { "Locked" } else { "Unlocked" };
        Ok(CommandOutput::ok(format_lock_change(
            verb,
            &changed,
            paths.len(),
        )))
    }

    fn docs(&self, command: &DocsCommands) -> Result<CommandOutput, WeldError> {
        let cache = DocCache::open_default()?;
        let text = match command {
            DocsCommands::Index => format_docs_index(&cache.index(&self.root()?)?),
            DocsCommands::Clear => format_docs_clear(cache.clear()?),
        };
        Ok(CommandOutput::ok(text))
    }

    async fn provider(&self, command: &ProviderCommands) -> Result<CommandOutput, WeldError> {
        let registry = ProviderRegistry::from_config(&self.config);
        match command {
            ProviderCommands::List { format } => {
                let text = if format == "json" {
                    format_provider_list_json(&registry)?
                } else {
                    format_provider_list_text(&registry)
                };
                Ok(CommandOutput::ok(text))
            }
            ProviderCommands::Test { name } => {
                let report = test_provider(&registry, name.as_deref()).await?;
                let exit_code = if report.connected { 0 } else { 1 };
                Ok(CommandOutput {
                    text: format_provider_test_result(&report),
                    exit_code,
                })
            }
        }
    }
}

/// Configuration errors propagate; connection failures are part of the report.
pub async fn test_provider(
    registry: &ProviderRegistry,
    name: Option<&str>,
) -> Result<ProviderTestReport, WeldError> {
    let resolved = registry.resolve_name(name).to_string();
    let (provider, _) = registry.create_provider(Some(&resolved))?;
    match provider.validate_connection().await {
        Ok(()) => {
            let models = match provider.list_models().await {
                Ok(models) => models,
                Err(e) => {
                    warn!(provider = %resolved, error = %e, "Listing models failed");
                    None
                }
            };
            Ok(ProviderTestReport {
                name: resolved,
                connected: true,
                error: None,
                models,
            })
        }
        Err(e) => Ok(ProviderTestReport {
            name: resolved,
            connected: false,
            error: Some(e.to_string()),
            models: None,
        }),
    }
}
