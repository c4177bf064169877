//! Self-healing generation loop
//!
//! `Generate -> Validate -> { Done | Repair(n) -> Validate -> ... }`, ending in
//! success or exhaustion after `max_retries` attempts. The first attempt is the
//! initial generation; each repair starts from the code the previous attempt
//! produced, so fixes compound.

use crate::analysis::{Diagnostic, Project, Target};
use crate::error::{ProviderError, WeldError};
use crate::normalizer::Normalizer;
use crate::prompt::{build_prompt, build_repair_prompt};
use crate::provider::{GenerateOptions, ModelProvider};
use crate::resolver::ContextBundle;
use crate::validator::Validator;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingOutcome {
    pub success: bool,
    /// Valid code on success; the last attempt's code on exhaustion.
    pub code: Option<String>,
    pub attempts: u32,
    /// Diagnostics or provider failures from the last attempt.
    pub errors: Vec<String>,
}

impl HealingOutcome {
    /// Exhaustion as a typed error; `None` on success.
    pub fn exhausted_error(&self) -> Option<WeldError> {
        (!self.success).then_some(WeldError::RetryExhausted {
            attempts: self.attempts,
        })
    }
}

pub struct SelfHealer<'a> {
    provider: &'a dyn ModelProvider,
    normalizer: Normalizer<'a>,
    validator: &'a Validator,
    options: GenerateOptions,
}

impl<'a> SelfHealer<'a> {
    pub fn new(
        provider: &'a dyn ModelProvider,
        project: &'a Project,
        validator: &'a Validator,
        options: GenerateOptions,
    ) -> Self {
        Self {
            provider,
            normalizer: Normalizer::new(project),
            validator,
            options,
        }
    }

    /// Provider failures on the initial generation propagate; during repair they count as a failed attempt.
    pub async fn generate_with_repair(
        &self,
        target: &Target,
        bundle: &ContextBundle,
        output_path: &Path,
        max_retries: u32,
    ) -> Result<HealingOutcome, WeldError> {
        let max_attempts = max_retries.max(1);

        let prompt = build_prompt(target, bundle);
        let raw = self.provider.generate(&prompt, &self.options).await?;
        let mut code = self.normalize(&raw, target, output_path);
        let mut result = self.validator.validate(&code, target, output_path).await?;
        if result.is_valid {
            info!(target = %target.name, attempt = 1, "Generated valid implementation");
            return Ok(success(code, 1));
        }
        let mut diagnostics: Vec<Diagnostic> = result.diagnostics;
        let mut errors: Vec<String> = diagnostics.iter().map(Diagnostic::render).collect();

        for attempt in 2..=max_attempts {
            debug!(
                target = %target.name,
                attempt,
                diagnostics = diagnostics.len(),
                "Attempting repair"
            );
            let prompt = build_repair_prompt(target, bundle, &code, &diagnostics);
            let raw = match self.provider.generate(&prompt, &self.options).await {
                Ok(raw) => raw,
                Err(e) if is_retryable(&e) => {
                    warn!(target = %target.name, attempt, error = %e, "Repair attempt failed");
                    errors = vec![e.to_string()];
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            code = self.normalize(&raw, target, output_path);
            result = self.validator.validate(&code, target, output_path).await?;
            if result.is_valid {
                info!(target = %target.name, attempt, "Repaired implementation");
                return Ok(success(code, attempt));
            }
            diagnostics = result.diagnostics;
            errors = diagnostics.iter().map(Diagnostic::render).collect();
        }

        warn!(
            target = %target.name,
            attempts = max_attempts,
            "Validation failed after {} retry attempts",
            max_attempts
        );
        Ok(HealingOutcome {
            success: false,
            code: Some(code),
            attempts: max_attempts,
            errors,
        })
    }

    fn normalize(&self, raw: &str, target: &Target, output_path: &Path) -> String {
        let normalized = self.normalizer.normalize_detailed(raw, target, output_path);
        if !normalized.is_confident() {
            debug!(
                target = %target.name,
                class_found = normalized.class_found,
                unresolved = ?normalized.unresolved,
                "Normalizer heuristics were not confident; deferring to validation"
            );
        }
        normalized.code
    }
}

fn success(code: String, attempts: u32) -> HealingOutcome {
    HealingOutcome {
        success: true,
        code: Some(code),
        attempts,
        errors: Vec::new(),
    }
}

fn is_retryable(error: &ProviderError) -> bool {
    error.is_transport() || matches!(error, ProviderError::InvalidResponse(_))
}
