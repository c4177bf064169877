//! Persistent lock registry: output files generation must not touch.
//!
//! The manifest is a JSON array of absolute paths, rewritten sorted and
//! deduplicated on every lock or unlock.

use crate::error::WeldError;
use crate::paths::canonicalize_path;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    manifest: Option<PathBuf>,
    paths: BTreeSet<PathBuf>,
}

impl LockRegistry {
    /// Read the manifest; a missing file is an empty registry.
    pub fn load(manifest: &Path) -> Result<Self, WeldError> {
        let paths = if manifest.exists() {
            let bytes = std::fs::read(manifest)?;
            let listed: Vec<PathBuf> = serde_json::from_slice(&bytes).map_err(|e| {
                WeldError::Lock(format!(
                    "Invalid lock manifest {}: {}",
                    manifest.display(),
                    e
                ))
            })?;
            listed.into_iter().collect()
        } else {
            BTreeSet::new()
        };
        debug!(manifest = %manifest.display(), locked = paths.len(), "Loaded lock manifest");
        Ok(Self {
            manifest: Some(manifest.to_path_buf()),
            paths,
        })
    }

    /// A registry that is never persisted.
    pub fn in_memory(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            manifest: None,
            paths: paths.into_iter().collect(),
        }
    }

    pub fn is_locked(&self, path: &Path) -> bool {
        if self.paths.contains(path) {
            return true;
        }
        let base = path.parent().unwrap_or(Path::new("/"));
        canonicalize_path(path, base)
            .map(|p| self.paths.contains(&p))
            .unwrap_or(false)
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Lock `paths` (relative ones resolve against `base`). Returns the newly locked paths.
    pub fn lock(&mut self, paths: &[PathBuf], base: &Path) -> Result<Vec<PathBuf>, WeldError> {
        let mut added = Vec::new();
        for path in paths {
            let canonical = canonicalize_path(path, base)?;
            if self.paths.insert(canonical.clone()) {
                added.push(canonical);
            }
        }
        self.save()?;
        info!(added = added.len(), total = self.paths.len(), "Locked paths");
        Ok(added)
    }

    /// Unlock `paths`. Returns the paths that were locked before.
    pub fn unlock(&mut self, paths: &[PathBuf], base: &Path) -> Result<Vec<PathBuf>, WeldError> {
        let mut removed = Vec::new();
        for path in paths {
            let canonical = canonicalize_path(path, base)?;
            if self.paths.remove(&canonical) {
                removed.push(canonical);
            }
        }
        self.save()?;
        info!(removed = removed.len(), total = self.paths.len(), "Unlocked paths");
        Ok(removed)
    }

    fn save(&self) -> Result<(), WeldError> {
        let manifest = match &self.manifest {
            Some(manifest) => manifest,
            None => return Ok(()),
        };
        if let Some(parent) = manifest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listed: Vec<&PathBuf> = self.paths.iter().collect();
        std::fs::write(manifest, serde_json::to_vec_pretty(&listed)?)?;
        Ok(())
    }
}
