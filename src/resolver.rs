//! Dependency resolution: the context bundle for one declaration
//!
//! Internal types are found by walking identifier references through the
//! project; every type sharing a module with a discovered dependency is pulled
//! in too. Third-party types come from the declaration module's imports and
//! are described by the documentation provider, or by a placeholder shape.

use crate::analysis::source::{contains_identifier, TypeDecl};
use crate::analysis::Project;
use crate::docs::DocumentationProvider;
use crate::error::ResolutionError;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::debug;

static CONSTRUCTOR_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnew\s+([A-Za-z_$][\w$]*)\s*[(<]").unwrap());

/// Runtime globals never treated as third-party packages.
const GLOBALS: &[&str] = &[
    "Array", "ArrayBuffer", "Boolean", "DataView", "Date", "Error", "EvalError", "Float32Array",
    "Float64Array", "Function", "Int8Array", "Int16Array", "Int32Array", "Map", "Number", "Object",
    "Promise", "Proxy", "RangeError", "ReferenceError", "RegExp", "Set", "String", "Symbol",
    "SyntaxError", "TextDecoder", "TextEncoder", "TypeError", "URL", "URLSearchParams",
    "Uint8Array", "Uint16Array", "Uint32Array", "WeakMap", "WeakRef", "WeakSet", "AbortController",
    "Headers", "Request", "Response", "EventTarget", "Event",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Internal,
    External,
}

/// One type made available to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub name: String,
    pub origin: Origin,
    /// Module path for internal entries, package name for external ones.
    pub locator: String,
    pub text: String,
}

/// Dependencies of one declaration, keyed by type name in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBundle {
    entries: IndexMap<String, ContextEntry>,
}

impl ContextBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the name is already present.
    pub fn insert(&mut self, entry: ContextEntry) -> bool {
        if self.entries.contains_key(&entry.name) {
            return false;
        }
        self.entries.insert(entry.name.clone(), entry);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ContextEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn internal(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries().filter(|e| e.origin == Origin::Internal)
    }

    pub fn external(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries().filter(|e| e.origin == Origin::External)
    }
}

pub struct DependencyResolver<'a> {
    project: &'a Project,
    docs: &'a dyn DocumentationProvider,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(project: &'a Project, docs: &'a dyn DocumentationProvider) -> Self {
        Self { project, docs }
    }

    pub fn resolve(&self, declaration: &TypeDecl) -> Result<ContextBundle, ResolutionError> {
        let target_name = declaration
            .name
            .clone()
            .ok_or_else(|| ResolutionError::Anonymous(declaration.path.clone()))?;

        let mut bundle = ContextBundle::new();
        self.resolve_internal(declaration, &target_name, &mut bundle);
        self.resolve_external(declaration, &mut bundle);

        debug!(
            target = %target_name,
            internal = bundle.internal().count(),
            external = bundle.external().count(),
            "Resolved context bundle"
        );
        Ok(bundle)
    }

    fn resolve_internal(&self, declaration: &TypeDecl, target_name: &str, bundle: &mut ContextBundle) {
        let universe: BTreeSet<String> = self
            .project
            .type_names()
            .into_iter()
            .filter(|name| name != target_name)
            .collect();

        let mut processed: BTreeSet<String> = BTreeSet::new();
        processed.insert(target_name.to_string());
        let mut work: Vec<String> = referenced_names(&declaration.text, &universe);

        while let Some(name) = work.pop() {
            if !processed.insert(name.clone()) {
                continue;
            }
            let found = match self.project.find_type(&name) {
                Some(found) => found,
                None => continue,
            };

            let mut added = vec![found.clone()];
            for sibling in self.project.declarations_in(&found.path) {
                let sibling_name = match &sibling.name {
                    Some(n) => n.clone(),
                    None => continue,
                };
                if processed.insert(sibling_name) {
                    added.push(sibling);
                }
            }

            for decl in added {
                for next in referenced_names(&decl.text, &universe) {
                    if !processed.contains(&next) {
                        work.push(next);
                    }
                }
                bundle.insert(internal_entry(&decl));
            }
        }
    }

    fn resolve_external(&self, declaration: &TypeDecl, bundle: &mut ContextBundle) {
        let module_text = self
            .project
            .file(&declaration.path)
            .map(|f| f.text.clone())
            .unwrap_or_default();

        // identifier -> package
        let mut packages: BTreeMap<String, String> = BTreeMap::new();
        for import in self.project.imports_of(&declaration.path) {
            if let Some(package) = import.package_name() {
                for local in import.local_names() {
                    packages.insert(local.to_string(), package.clone());
                }
            }
        }

        let constructed: BTreeSet<String> = CONSTRUCTOR_CALL_RE
            .captures_iter(&module_text)
            .map(|caps| caps[1].to_string())
            .collect();

        let mut used: BTreeMap<String, String> = BTreeMap::new();
        for (ident, package) in &packages {
            if constructed.contains(ident) || contains_identifier(&declaration.text, ident) {
                used.insert(ident.clone(), package.clone());
            }
        }
        let known = self.project.type_names();
        for ident in &constructed {
            if used.contains_key(ident)
                || packages.contains_key(ident)
                || known.contains(ident)
                || GLOBALS.contains(&ident.as_str())
            {
                continue;
            }
            used.insert(ident.clone(), guess_package_name(ident));
        }

        let mut docs_by_package: HashMap<String, Option<String>> = HashMap::new();
        for (ident, package) in used {
            if bundle.contains(&ident) {
                continue;
            }
            let docs = docs_by_package
                .entry(package.clone())
                .or_insert_with(|| self.docs.formatted_docs(&package))
                .clone();
            let text = docs.unwrap_or_else(|| {
                debug!(identifier = %ident, package = %package, "No documentation; using placeholder");
                placeholder_declaration(&ident)
            });
            bundle.insert(ContextEntry {
                name: ident,
                origin: Origin::External,
                locator: package,
                text,
            });
        }
    }
}

fn internal_entry(decl: &TypeDecl) -> ContextEntry {
    ContextEntry {
        name: decl.display_name().to_string(),
        origin: Origin::Internal,
        locator: decl.path.display().to_string(),
        text: decl.text.clone(),
    }
}

fn referenced_names(text: &str, universe: &BTreeSet<String>) -> Vec<String> {
    universe
        .iter()
        .filter(|name| contains_identifier(text, name))
        .cloned()
        .collect()
}

/// Minimal shape for an external type with no documentation.
pub fn placeholder_declaration(name: &str) -> String {
    format!(
        "declare class {} {{\n  constructor(...args: any[]);\n  [key: string]: any;\n}}",
        name
    )
}

/// `RedisClient` -> `redis-client`
pub fn guess_package_name(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len() + 4);
    let chars: Vec<char> = identifier.chars().collect();
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).map_or(false, |c| c.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
