//! In-memory TypeScript project keyed by file path.

use crate::analysis::source::{
    self, DeclarationKind, ImportDecl, MemberKind, TypeDecl, TypeKind,
};
use crate::error::WeldError;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};
use walkdir::WalkDir;

/// A parsed module.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub imports: Vec<ImportDecl>,
    pub declarations: Vec<TypeDecl>,
}

impl SourceFile {
    pub fn parse(path: &Path, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: path.to_path_buf(),
            imports: source::parse_imports(&text),
            declarations: source::parse_declarations(path, &text),
            text,
        }
    }
}

/// A declaration selected for generation.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub kind: DeclarationKind,
    pub declaration: TypeDecl,
}

impl Target {
    pub fn from_declaration(declaration: TypeDecl) -> Option<Self> {
        let kind = declaration.declaration_kind()?;
        let name = declaration.name.clone()?;
        Some(Self {
            name,
            kind,
            declaration,
        })
    }

    /// Implementation class name, always `${Name}Impl`.
    pub fn impl_name(&self) -> String {
        impl_name_for(&self.name)
    }
}

pub fn impl_name_for(name: &str) -> String {
    format!("{}Impl", name)
}

/// Result of scanning for marker-decorated members.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub targets: Vec<Target>,
    /// Referenced types that are neither an interface nor an abstract class.
    pub unresolved: Vec<String>,
}

/// Stateful project: parsed modules keyed by absolute path.
pub struct Project {
    root: PathBuf,
    files: RwLock<BTreeMap<PathBuf, Arc<SourceFile>>>,
    /// Units under validation; reachable through `file` only.
    staged: RwLock<BTreeSet<PathBuf>>,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: RwLock::new(BTreeMap::new()),
            staged: RwLock::new(BTreeSet::new()),
        }
    }

    /// Load every `.ts` module under `source_dirs`, skipping declaration files,
    /// `node_modules` and anything under `exclude`.
    pub fn load(root: &Path, source_dirs: &[PathBuf], exclude: &[PathBuf]) -> Result<Self, WeldError> {
        let project = Self::new(root);
        for dir in source_dirs {
            let dir = if dir.is_absolute() {
                dir.clone()
            } else {
                root.join(dir)
            };
            if !dir.exists() {
                debug!(dir = %dir.display(), "Source directory does not exist, skipping");
                continue;
            }
            for entry in WalkDir::new(&dir)
                .into_iter()
                .filter_entry(|e| e.file_name() != "node_modules")
            {
                let entry = entry.map_err(|e| WeldError::Analysis(e.to_string()))?;
                let path = entry.path();
                if !entry.file_type().is_file() || !is_typescript_module(path) {
                    continue;
                }
                if exclude.iter().any(|ex| path.starts_with(ex)) {
                    continue;
                }
                let text = std::fs::read_to_string(path)?;
                project.add_source(path, text);
            }
        }
        debug!(files = project.file_count(), root = %root.display(), "Project loaded");
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    pub fn add_source(&self, path: &Path, text: impl Into<String>) {
        let file = SourceFile::parse(path, text);
        self.files.write().insert(path.to_path_buf(), Arc::new(file));
    }

    /// Add a temporary compilation unit. Pair with [`Project::unstage`].
    ///
    /// Staged units are hidden from `find_type`, `type_names` and discovery.
    pub fn stage(&self, path: &Path, text: &str) {
        self.staged.write().insert(path.to_path_buf());
        self.add_source(path, text);
    }

    pub fn unstage(&self, path: &Path) {
        self.files.write().remove(path);
        self.staged.write().remove(path);
    }

    fn is_staged(&self, path: &Path) -> bool {
        self.staged.read().contains(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    pub fn file(&self, path: &Path) -> Option<Arc<SourceFile>> {
        self.files.read().get(path).cloned()
    }

    pub fn imports_of(&self, path: &Path) -> Vec<ImportDecl> {
        self.file(path).map(|f| f.imports.clone()).unwrap_or_default()
    }

    pub fn declarations_in(&self, path: &Path) -> Vec<TypeDecl> {
        self.file(path)
            .map(|f| f.declarations.clone())
            .unwrap_or_default()
    }

    /// Locate a named declaration, preferring exported ones.
    pub fn find_type(&self, name: &str) -> Option<TypeDecl> {
        let files = self.files.read();
        let mut fallback = None;
        for file in files.values().filter(|f| !self.is_staged(&f.path)) {
            for decl in &file.declarations {
                if decl.name.as_deref() != Some(name) {
                    continue;
                }
                if decl.exported {
                    return Some(decl.clone());
                }
                if fallback.is_none() {
                    fallback = Some(decl.clone());
                }
            }
        }
        fallback
    }

    /// Every named declaration in the project.
    pub fn type_names(&self) -> BTreeSet<String> {
        self.files
            .read()
            .values()
            .filter(|f| !self.is_staged(&f.path))
            .flat_map(|f| f.declarations.iter().filter_map(|d| d.name.clone()))
            .collect()
    }

    /// Find generation targets: types of class members decorated with `marker`.
    ///
    /// With `only`, just those modules are scanned for marker usages.
    pub fn discover_targets(&self, marker: &str, only: Option<&[PathBuf]>) -> DiscoveryReport {
        let mut referenced = BTreeSet::new();
        {
            let files = self.files.read();
            for file in files.values().filter(|f| !self.is_staged(&f.path)) {
                if let Some(only) = only {
                    if !only.iter().any(|p| p == &file.path) {
                        continue;
                    }
                }
                for decl in &file.declarations {
                    if !matches!(decl.kind, TypeKind::Class | TypeKind::AbstractClass) {
                        continue;
                    }
                    for member in &decl.members {
                        if member.kind != MemberKind::Property || !member.has_decorator(marker) {
                            continue;
                        }
                        if let Some(ty) = member.type_text.as_deref().and_then(base_type_name) {
                            referenced.insert(ty);
                        }
                    }
                }
            }
        }

        let mut report = DiscoveryReport::default();
        for name in referenced {
            match self.find_type(&name).and_then(Target::from_declaration) {
                Some(target) => report.targets.push(target),
                None => {
                    error!(
                        type_name = %name,
                        "Injected type is neither an interface nor an abstract class; skipping"
                    );
                    report.unresolved.push(name);
                }
            }
        }
        report
    }
}

/// `Repo<User>[]` -> `Repo`
pub fn base_type_name(type_text: &str) -> Option<String> {
    let stripped = source::strip_type_arguments(type_text);
    let name: String = stripped
        .trim()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn is_typescript_module(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    (name.ends_with(".ts") || name.ends_with(".tsx")) && !name.ends_with(".d.ts")
}
