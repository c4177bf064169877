//! Run context
//!
//! Everything one invocation needs, passed explicitly through the pipeline:
//! the workspace root, loaded configuration, the lock registry read at start,
//! the analysis project and the documentation provider.

use crate::analysis::{ConformanceChecker, Project, Target, TscChecker, TypeChecker};
use crate::config::{CheckerKind, WeldConfig};
use crate::docs::{DocCache, DocumentationProvider, NoDocs};
use crate::error::WeldError;
use crate::lock::LockRegistry;
use crate::paths::canonicalize_path;
use crate::provider::ProviderRegistry;
use crate::validator::Validator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct RunContext {
    pub workspace_root: PathBuf,
    pub config: WeldConfig,
    pub locks: LockRegistry,
    pub project: Arc<Project>,
    pub docs: Arc<dyn DocumentationProvider>,
}

impl RunContext {
    pub fn new(
        workspace_root: PathBuf,
        config: WeldConfig,
        locks: LockRegistry,
        project: Arc<Project>,
        docs: Arc<dyn DocumentationProvider>,
    ) -> Self {
        Self {
            workspace_root,
            config,
            locks,
            project,
            docs,
        }
    }

    /// Load the project sources, lock manifest and documentation cache for a workspace.
    pub fn open(workspace_root: &Path, config: WeldConfig) -> Result<Self, WeldError> {
        let cwd = std::env::current_dir()?;
        let root = canonicalize_path(workspace_root, &cwd)?;
        let locks = LockRegistry::load(&config.lock_manifest(&root))?;

        // generated output never feeds back into analysis
        let mut exclude: Vec<PathBuf> = vec![config.out_dir(&root)];
        exclude.extend(config.generation.exclude.iter().map(|p| root.join(p)));
        let project = Project::load(&root, &config.generation.source_dirs, &exclude)?;

        let docs: Arc<dyn DocumentationProvider> = match DocCache::open_default() {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                warn!(error = %e, "Documentation cache unavailable; external types get placeholders");
                Arc::new(NoDocs)
            }
        };

        info!(
            workspace = %root.display(),
            files = project.file_count(),
            locked = locks.len(),
            "Opened workspace"
        );
        Ok(Self::new(root, config, locks, Arc::new(project), docs))
    }

    pub fn out_dir(&self) -> PathBuf {
        self.config.out_dir(&self.workspace_root)
    }

    /// `<workspace>/<out_dir>/XImpl.ts`
    pub fn output_path(&self, target: &Target) -> PathBuf {
        self.out_dir().join(format!("{}.ts", target.impl_name()))
    }

    pub fn registry_path(&self) -> PathBuf {
        self.out_dir().join(&self.config.generation.registry_file)
    }

    pub fn lock_manifest(&self) -> PathBuf {
        self.config.lock_manifest(&self.workspace_root)
    }

    pub fn checker(&self) -> Arc<dyn TypeChecker> {
        match self.config.generation.checker {
            CheckerKind::Conformance => Arc::new(ConformanceChecker::new()),
            CheckerKind::Tsc => Arc::new(TscChecker::new(
                self.config.generation.tsc_command.clone(),
            )),
        }
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.project.clone(), self.checker())
    }

    pub fn providers(&self) -> ProviderRegistry {
        ProviderRegistry::from_config(&self.config)
    }
}
