//! Configuration System
//!
//! Layered configuration for a run: built-in defaults, the global config file,
//! workspace files and `WELD__*` environment overrides, merged by the `config`
//! crate and deserialized into [`WeldConfig`].

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeldConfig {
    /// Model provider configurations, keyed by provider name
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderConfig>,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_providers() -> BTreeMap<String, ProviderConfig> {
    let mut providers = BTreeMap::new();
    providers.insert(
        crate::provider::DEFAULT_PROVIDER.to_string(),
        ProviderConfig::http(crate::provider::DEFAULT_HTTP_ENDPOINT),
    );
    providers
}

impl Default for WeldConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            generation: GenerationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Which backend validates generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckerKind {
    #[default]
    Conformance,
    Tsc,
}

/// Generation pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Provider name; `None` resolves to the `default` provider
    #[serde(default)]
    pub provider: Option<String>,

    /// Global default model, the last fallback of model resolution
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Decorator name that marks an injected dependency
    #[serde(default = "default_marker")]
    pub marker: String,

    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    #[serde(default = "default_source_dirs")]
    pub source_dirs: Vec<PathBuf>,

    /// Workspace-relative paths skipped while loading sources
    #[serde(default)]
    pub exclude: Vec<PathBuf>,

    /// Wiring module file name, written inside `out_dir`
    #[serde(default = "default_registry_file")]
    pub registry_file: String,

    #[serde(default)]
    pub checker: CheckerKind,

    #[serde(default = "default_tsc_command")]
    pub tsc_command: Vec<String>,

    #[serde(default = "default_lock_manifest")]
    pub lock_manifest: PathBuf,
}

fn default_max_retries() -> u32 {
    crate::healing::DEFAULT_MAX_RETRIES
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_marker() -> String {
    "Inject".to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("src/generated")
}

fn default_source_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}

fn default_registry_file() -> String {
    "container.ts".to_string()
}

fn default_tsc_command() -> Vec<String> {
    vec!["npx".to_string(), "tsc".to_string()]
}

fn default_lock_manifest() -> PathBuf {
    PathBuf::from(".weld/locks.json")
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            marker: default_marker(),
            out_dir: default_out_dir(),
            source_dirs: default_source_dirs(),
            exclude: Vec::new(),
            registry_file: default_registry_file(),
            checker: CheckerKind::default(),
            tsc_command: default_tsc_command(),
            lock_manifest: default_lock_manifest(),
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.marker.trim().is_empty() {
            return Err("marker cannot be empty".to_string());
        }
        if self.out_dir.as_os_str().is_empty() {
            return Err("out_dir cannot be empty".to_string());
        }
        if self.source_dirs.is_empty() {
            return Err("source_dirs cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than zero".to_string());
        }
        if self.registry_file.trim().is_empty() {
            return Err("registry_file cannot be empty".to_string());
        }
        if self.checker == CheckerKind::Tsc && self.tsc_command.is_empty() {
            return Err("tsc_command cannot be empty when checker = \"tsc\"".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Provider(String, String),
    Generation(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(name, msg) => write!(f, "Provider '{}': {}", name, msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl WeldConfig {
    /// Validate the whole configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (name, provider) in &self.providers {
            if let Err(e) = provider.validate() {
                errors.push(ValidationError::Provider(name.clone(), e));
            }
        }

        if let Err(e) = self.generation.validate() {
            errors.push(ValidationError::Generation(e));
        }

        if let Some(name) = &self.generation.provider {
            if !self.providers.contains_key(name) {
                errors.push(ValidationError::Generation(format!(
                    "provider '{}' is not configured",
                    name
                )));
            }
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn out_dir(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.generation.out_dir)
    }

    pub fn lock_manifest(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.generation.lock_manifest)
    }
}
