//! Third-party type documentation
//!
//! The resolver asks a [`DocumentationProvider`] for a formatted summary of a
//! package's public types. [`DocCache`] keeps one JSON entry per package under
//! the user cache directory, populated by [`DocCache::index`] from a
//! workspace's declared dependencies.

use crate::error::WeldError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Longest declaration summary stored per package.
pub const MAX_SUMMARY_BYTES: usize = 16 * 1024;

/// Supplies formatted third-party type documentation.
pub trait DocumentationProvider: Send + Sync {
    fn formatted_docs(&self, package: &str) -> Option<String>;
}

/// A provider that never has documentation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDocs;

impl DocumentationProvider for NoDocs {
    fn formatted_docs(&self, _package: &str) -> Option<String> {
        None
    }
}

/// One cached package summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocEntry {
    pub package: String,
    pub version: Option<String>,
    pub summary: String,
}

impl DocEntry {
    pub fn format(&self) -> String {
        let version = self.version.as_deref().unwrap_or("unknown");
        format!(
            "// Package: {} ({})\n{}",
            self.package,
            version,
            self.summary.trim_end()
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub indexed: usize,
    pub missing: Vec<String>,
}

/// On-disk documentation cache, one file per package.
#[derive(Debug, Clone)]
pub struct DocCache {
    dir: PathBuf,
}

impl DocCache {
    /// Cache under the user cache directory (`~/.cache/weld/docs` on Linux).
    pub fn open_default() -> Result<Self, WeldError> {
        let dirs = directories::ProjectDirs::from("", "", "weld").ok_or_else(|| {
            WeldError::Config("Could not determine user cache directory".to_string())
        })?;
        Ok(Self::at(dirs.cache_dir().join("docs")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, package: &str) -> PathBuf {
        let digest = blake3::hash(package.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest.as_bytes())))
    }

    pub fn get(&self, package: &str) -> Option<DocEntry> {
        let path = self.entry_path(package);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice::<DocEntry>(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(package, path = %path.display(), error = %e, "Corrupt documentation cache entry");
                None
            }
        }
    }

    pub fn put(&self, entry: &DocEntry) -> Result<(), WeldError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(&entry.package);
        std::fs::write(&path, serde_json::to_vec_pretty(entry)?)?;
        Ok(())
    }

    /// Index every dependency declared in `workspace/package.json`.
    pub fn index(&self, workspace: &Path) -> Result<IndexReport, WeldError> {
        let manifest_path = workspace.join("package.json");
        let manifest: serde_json::Value = serde_json::from_slice(&std::fs::read(&manifest_path)?)?;

        let mut packages = BTreeSet::new();
        for section in ["dependencies", "devDependencies"] {
            if let Some(deps) = manifest.get(section).and_then(|d| d.as_object()) {
                packages.extend(deps.keys().cloned());
            }
        }

        let mut report = IndexReport::default();
        for package in packages {
            match read_package_types(workspace, &package) {
                Some(entry) => {
                    self.put(&entry)?;
                    report.indexed += 1;
                    debug!(package = %package, "Indexed package types");
                }
                None => {
                    debug!(package = %package, "No type declarations found");
                    report.missing.push(package);
                }
            }
        }
        info!(
            indexed = report.indexed,
            missing = report.missing.len(),
            "Documentation index built"
        );
        Ok(report)
    }

    /// Remove every cached entry. Returns the number removed.
    pub fn clear(&self) -> Result<usize, WeldError> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl DocumentationProvider for DocCache {
    fn formatted_docs(&self, package: &str) -> Option<String> {
        self.get(package).map(|entry| entry.format())
    }
}

fn read_package_types(workspace: &Path, package: &str) -> Option<DocEntry> {
    let package_dir = workspace.join("node_modules").join(package);
    let manifest: Option<serde_json::Value> = std::fs::read(package_dir.join("package.json"))
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok());

    let version = manifest
        .as_ref()
        .and_then(|m| m.get("version"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let declared = manifest.as_ref().and_then(|m| {
        m.get("types")
            .or_else(|| m.get("typings"))
            .and_then(|t| t.as_str())
            .map(|t| package_dir.join(t))
    });

    let types_package = match package.strip_prefix('@') {
        Some(scoped) => scoped.replace('/', "__"),
        None => package.to_string(),
    };
    let candidates = [
        declared,
        Some(package_dir.join("index.d.ts")),
        Some(
            workspace
                .join("node_modules/@types")
                .join(types_package)
                .join("index.d.ts"),
        ),
    ];
    let text = candidates
        .into_iter()
        .flatten()
        .find_map(|path| std::fs::read_to_string(path).ok())?;

    Some(DocEntry {
        package: package.to_string(),
        version,
        summary: truncate_at_line(&text, MAX_SUMMARY_BYTES),
    })
}

fn truncate_at_line(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let cut = text[..cut].rfind('\n').unwrap_or(cut);
    format!("{}\n// ... truncated", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::write(
            root.join("package.json"),
            r#"{"dependencies":{"axios":"^1.0.0","left-pad":"1.0.0"},"devDependencies":{"@acme/util":"2.0.0"}}"#,
        )
        .unwrap();
        let axios = root.join("node_modules/axios");
        std::fs::create_dir_all(&axios).unwrap();
        std::fs::write(
            axios.join("package.json"),
            r#"{"version":"1.6.0","types":"index.d.ts"}"#,
        )
        .unwrap();
        std::fs::write(
            axios.join("index.d.ts"),
            "export declare class Axios {\n  get(url: string): Promise<unknown>;\n}\n",
        )
        .unwrap();
        let types = root.join("node_modules/@types/acme__util");
        std::fs::create_dir_all(&types).unwrap();
        std::fs::write(types.join("index.d.ts"), "export declare function pad(): void;\n").unwrap();
        temp
    }

    #[test]
    fn index_then_lookup() {
        let ws = workspace();
        let cache_dir = TempDir::new().unwrap();
        let cache = DocCache::at(cache_dir.path());

        let report = cache.index(ws.path()).unwrap();
        assert_eq!(report.indexed, 2);
        assert_eq!(report.missing, vec!["left-pad".to_string()]);

        let docs = cache.formatted_docs("axios").unwrap();
        assert!(docs.contains("Package: axios (1.6.0)"));
        assert!(docs.contains("export declare class Axios"));
        assert!(cache.formatted_docs("@acme/util").unwrap().contains("pad"));
        assert!(cache.formatted_docs("left-pad").is_none());
    }

    #[test]
    fn clear_removes_entries() {
        let ws = workspace();
        let cache_dir = TempDir::new().unwrap();
        let cache = DocCache::at(cache_dir.path().join("docs"));
        cache.index(ws.path()).unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(cache.formatted_docs("axios").is_none());
        assert_eq!(cache.clear().unwrap(), 0);
    }

    #[test]
    fn truncation_keeps_whole_lines() {
        let text = "line one\nline two\nline three\n";
        let out = truncate_at_line(text, 12);
        assert_eq!(out, "line one\n// ... truncated");
    }

    #[test]
    fn no_docs_always_misses() {
        assert!(NoDocs.formatted_docs("axios").is_none());
    }
}
