//! Concurrent orchestration of one pipeline per target.
//!
//! Per-target pre-checks run in order: lock, forced delete (only with an
//! explicit file subset), skip-if-exists, then the full pipeline. Every target
//! yields exactly one [`GenerationOutcome`]; a failing or panicking task never
//! cancels its siblings.

use crate::analysis::Target;
use crate::context::RunContext;
use crate::error::WeldError;
use crate::healing::{SelfHealer, DEFAULT_MAX_RETRIES};
use crate::provider::{GenerateOptions, ModelProvider};
use crate::resolver::DependencyResolver;
use crate::validator::Validator;
use crate::wiring::{self, ServiceRecord};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Generated,
    Skipped,
    Locked,
    Error,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Generated => "generated",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Locked => "locked",
            OutcomeStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub target_name: String,
    pub status: OutcomeStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Attempts used by the healing loop; zero when the pipeline did not run.
    #[serde(default)]
    pub attempts: u32,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<GenerationOutcome>,
    /// Records for implementations written in this run.
    pub records: Vec<ServiceRecord>,
}

impl RunSummary {
    pub fn has_errors(&self) -> bool {
        self.count(OutcomeStatus::Error) > 0
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn outcome(&self, target_name: &str) -> Option<&GenerationOutcome> {
        self.outcomes.iter().find(|o| o.target_name == target_name)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Overwrite existing output.
    pub force: bool,
    /// Explicit file subset; with `force`, existing output is deleted before regeneration.
    pub files: Option<Vec<PathBuf>>,
    pub max_retries: u32,
    pub generate: GenerateOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            files: None,
            max_retries: DEFAULT_MAX_RETRIES,
            generate: GenerateOptions::default(),
        }
    }
}

pub struct Orchestrator {
    ctx: Arc<RunContext>,
    provider: Arc<dyn ModelProvider>,
    validator: Arc<Validator>,
}

impl Orchestrator {
    pub fn new(
        ctx: Arc<RunContext>,
        provider: Arc<dyn ModelProvider>,
        validator: Arc<Validator>,
    ) -> Self {
        Self {
            ctx,
            provider,
            validator,
        }
    }

    /// Run every target concurrently and collect one outcome per target.
    pub async fn run(&self, targets: Vec<Target>, options: RunOptions) -> RunSummary {
        let options = Arc::new(options);
        info!(
            targets = targets.len(),
            provider = self.provider.provider_name(),
            checker = self.validator.checker_name(),
            force = options.force,
            "Starting generation run"
        );

        let mut tasks = FuturesUnordered::new();
        for target in targets {
            let name = target.name.clone();
            let handle = tokio::spawn(run_target(
                self.ctx.clone(),
                self.provider.clone(),
                self.validator.clone(),
                options.clone(),
                target,
            ));
            tasks.push(async move { (name, handle.await) });
        }

        let mut summary = RunSummary::default();
        while let Some((name, joined)) = tasks.next().await {
            match joined {
                Ok((outcome, record)) => {
                    summary.outcomes.push(outcome);
                    summary.records.extend(record);
                }
                Err(join_error) => {
                    error!(target = %name, error = %join_error, "Generation task failed");
                    summary.outcomes.push(GenerationOutcome {
                        target_name: name,
                        status: OutcomeStatus::Error,
                        duration_ms: 0,
                        error: Some(join_error.to_string()),
                        attempts: 0,
                    });
                }
            }
        }

        info!(
            generated = summary.count(OutcomeStatus::Generated),
            skipped = summary.count(OutcomeStatus::Skipped),
            locked = summary.count(OutcomeStatus::Locked),
            errors = summary.count(OutcomeStatus::Error),
            "Generation run finished"
        );
        summary
    }

    /// Merge this run's records with prior output and write the wiring module.
    pub fn write_registry(&self, summary: &RunSummary) -> Result<PathBuf, WeldError> {
        let out_dir = self.ctx.out_dir();
        let mut records = wiring::scan_existing(
            &out_dir,
            &self.ctx.config.generation.marker,
            Some(self.ctx.project.as_ref()),
        )?;
        records.extend(summary.records.iter().cloned());

        let path = self.ctx.registry_path();
        let text = wiring::assemble(&records, &out_dir);
        wiring::write_registry(&path, &text)?;
        info!(path = %path.display(), services = wiring::deduplicate(&records).len(), "Wrote registry");
        Ok(path)
    }
}

async fn run_target(
    ctx: Arc<RunContext>,
    provider: Arc<dyn ModelProvider>,
    validator: Arc<Validator>,
    options: Arc<RunOptions>,
    target: Target,
) -> (GenerationOutcome, Option<ServiceRecord>) {
    let started = Instant::now();
    let output = ctx.output_path(&target);
    let finish = |status: OutcomeStatus, error: Option<String>, attempts: u32| {
        let duration_ms = started.elapsed().as_millis() as u64;
        GenerationOutcome {
            target_name: target.name.clone(),
            status,
            duration_ms,
            error,
            attempts,
        }
    };

    if ctx.locks.is_locked(&output) {
        info!(target = %target.name, path = %output.display(), "Output is locked; skipping");
        return (finish(OutcomeStatus::Locked, None, 0), None);
    }

    if options.force && options.files.is_some() && output.exists() {
        if let Err(e) = tokio::fs::remove_file(&output).await {
            error!(target = %target.name, error = %e, "Failed to remove previous output");
            return (finish(OutcomeStatus::Error, Some(e.to_string()), 0), None);
        }
        debug!(target = %target.name, path = %output.display(), "Removed previous output");
    }

    if output.exists() && !options.force {
        info!(target = %target.name, path = %output.display(), "Output exists; skipping");
        return (finish(OutcomeStatus::Skipped, None, 0), None);
    }

    match generate(&ctx, provider.as_ref(), &validator, &options, &target, &output).await {
        Ok((record, attempts)) => {
            let outcome = finish(OutcomeStatus::Generated, None, attempts);
            info!(
                target = %target.name,
                attempts,
                duration_ms = outcome.duration_ms,
                path = %output.display(),
                "Generated implementation"
            );
            (outcome, Some(record))
        }
        Err((e, attempts)) => {
            let outcome = finish(OutcomeStatus::Error, Some(e.to_string()), attempts);
            error!(
                target = %target.name,
                attempts,
                duration_ms = outcome.duration_ms,
                error = %e,
                "Generation failed"
            );
            (outcome, None)
        }
    }
}

async fn generate(
    ctx: &RunContext,
    provider: &dyn ModelProvider,
    validator: &Validator,
    options: &RunOptions,
    target: &Target,
    output: &std::path::Path,
) -> Result<(ServiceRecord, u32), (WeldError, u32)> {
    let bundle = DependencyResolver::new(&ctx.project, ctx.docs.as_ref())
        .resolve(&target.declaration)
        .map_err(|e| (WeldError::from(e), 0))?;
    debug!(target = %target.name, context_entries = bundle.len(), "Resolved dependencies");

    let healer = SelfHealer::new(provider, &ctx.project, validator, options.generate.clone());
    let outcome = healer
        .generate_with_repair(target, &bundle, output, options.max_retries)
        .await
        .map_err(|e| (e, 1))?;

    if let Some(e) = outcome.exhausted_error() {
        for message in &outcome.errors {
            warn!(target = %target.name, diagnostic = %message, "Unresolved diagnostic");
        }
        return Err((e, outcome.attempts));
    }
    let Some(code) = outcome.code else {
        return Err((
            WeldError::Analysis("healing loop returned no code".to_string()),
            outcome.attempts,
        ));
    };

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| (WeldError::from(e), outcome.attempts))?;
    }
    tokio::fs::write(output, &code)
        .await
        .map_err(|e| (WeldError::from(e), outcome.attempts))?;

    let record = wiring::record_from_code(target, output, &code, &ctx.config.generation.marker);
    Ok((record, outcome.attempts))
}
