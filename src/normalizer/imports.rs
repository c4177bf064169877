//! Import reconciliation for generated modules.

use crate::analysis::source::{contains_identifier, ImportDecl, ImportedName};
use crate::analysis::{Project, Target};
use crate::paths::{module_specifier, rebase_specifier};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

/// Capitalized identifiers in type-assertion, annotation, construction,
/// type-argument, heritage and static-access positions.
static CANDIDATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bas\s+([A-Z][\w$]*)",
        r":\s*([A-Z][\w$]*)",
        r"\bnew\s+([A-Z][\w$]*)",
        r"<\s*([A-Z][\w$]*)",
        r"\b(?:extends|implements)\s+([A-Z][\w$]*)",
        r"[|&,]\s*([A-Z][\w$]*)\s*[\[>|&;,)=]",
        r"(?:^|[^.\w$])([A-Z][\w$]*)\.[A-Za-z_$]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TYPE_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<,]\s*([A-Z][\w$]*)\s+extends\b").unwrap());

/// Names the TypeScript environment provides without an import.
const AMBIENT: &[&str] = &[
    "AbortController", "Array", "ArrayBuffer", "ArrayLike", "AsyncGenerator", "AsyncIterable",
    "AsyncIterator", "Awaited", "BigInt", "Boolean", "Buffer", "Capitalize", "ConstructorParameters",
    "DataView", "Date", "Error", "Event", "EventTarget", "Exclude", "Extract", "Float32Array",
    "Float64Array", "Function", "Generator", "Headers", "InstanceType", "Int16Array", "Int32Array",
    "Int8Array", "Intl", "Iterable", "Iterator", "JSON", "Lowercase", "Map", "Math", "NaN",
    "NodeJS", "NonNullable", "Number", "Object", "Omit", "Parameters", "Partial", "Pick",
    "Promise", "PromiseLike", "PropertyKey", "Proxy", "RangeError", "Readonly", "ReadonlyArray",
    "ReadonlyMap", "ReadonlySet", "Record", "Reflect", "RegExp", "Request", "Required", "Response",
    "ReturnType", "Set", "String", "Symbol", "SyntaxError", "TextDecoder", "TextEncoder",
    "ThisType", "TypeError", "URL", "URLSearchParams", "Uint16Array", "Uint32Array", "Uint8Array",
    "Uncapitalize", "Uppercase", "WeakMap", "WeakRef", "WeakSet",
];

pub struct ImportPlan {
    pub imports: Vec<ImportDecl>,
    /// Identifiers used in the body that no import or project declaration explains.
    pub unresolved: Vec<String>,
}

impl ImportPlan {
    pub fn render(&self) -> String {
        self.imports
            .iter()
            .map(ImportDecl::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Rebuild the import section of a generated module from scratch.
///
/// `body` must already have comments and string contents blanked.
pub fn reconcile(
    project: &Project,
    target: &Target,
    output_dir: &Path,
    body: &str,
    model_imports: &[ImportDecl],
    declared_in_body: &BTreeSet<String>,
) -> ImportPlan {
    let declaration_path = &target.declaration.path;
    let declaration_dir = declaration_path.parent().unwrap_or(Path::new("."));

    let mut imports: Vec<ImportDecl> = project
        .imports_of(declaration_path)
        .into_iter()
        .map(|mut import| {
            import.specifier = rebase_specifier(&import.specifier, declaration_dir, output_dir);
            import
        })
        .collect();
    add_named(
        &mut imports,
        &module_specifier(output_dir, declaration_path),
        &target.name,
    );

    let mut covered: BTreeSet<String> = imports
        .iter()
        .flat_map(|i| i.local_names().into_iter().map(str::to_string))
        .collect();
    covered.extend(declared_in_body.iter().cloned());
    covered.insert(target.impl_name());
    covered.extend(
        TYPE_PARAM_RE
            .captures_iter(body)
            .map(|caps| caps[1].to_string()),
    );

    let mut unresolved = Vec::new();
    for candidate in candidates(body) {
        if covered.contains(&candidate)
            || candidate.len() == 1
            || AMBIENT.contains(&candidate.as_str())
        {
            continue;
        }
        if let Some(model_import) = model_imports
            .iter()
            .find(|i| i.package_name().is_some() && i.local_names().contains(&candidate.as_str()))
        {
            add_from_model(&mut imports, model_import, &candidate);
        } else if let Some(decl) = project.find_type(&candidate).filter(|d| d.exported) {
            add_named(
                &mut imports,
                &module_specifier(output_dir, &decl.path),
                &candidate,
            );
        } else {
            unresolved.push(candidate.clone());
        }
        covered.insert(candidate);
    }

    // value bindings such as a default-imported client
    for model_import in model_imports.iter().filter(|i| i.package_name().is_some()) {
        for local in model_import.local_names() {
            if !covered.contains(local) && contains_identifier(body, local) {
                add_from_model(&mut imports, model_import, local);
                covered.insert(local.to_string());
            }
        }
    }

    ImportPlan {
        imports,
        unresolved,
    }
}

fn candidates(body: &str) -> BTreeSet<String> {
    CANDIDATE_RES
        .iter()
        .flat_map(|re| re.captures_iter(body).map(|caps| caps[1].to_string()))
        .collect()
}

fn add_named(imports: &mut Vec<ImportDecl>, specifier: &str, name: &str) {
    if let Some(existing) = imports
        .iter_mut()
        .find(|i| i.specifier == specifier && !i.type_only && i.namespace.is_none())
    {
        if !existing.local_names().contains(&name) {
            existing.named.push(ImportedName {
                name: name.to_string(),
                alias: None,
            });
        }
        return;
    }
    imports.push(ImportDecl::named(specifier, &[name]));
}

fn add_from_model(imports: &mut Vec<ImportDecl>, model_import: &ImportDecl, local: &str) {
    if let Some(named) = model_import.named.iter().find(|n| n.local() == local) {
        if named.alias.is_none() {
            add_named(imports, &model_import.specifier, &named.name);
            return;
        }
        let mut single = ImportDecl::named(model_import.specifier.clone(), &[]);
        single.named.push(named.clone());
        imports.push(single);
        return;
    }
    let mut single = ImportDecl::named(model_import.specifier.clone(), &[]);
    if model_import.default.as_deref() == Some(local) {
        single.default = Some(local.to_string());
    } else {
        single.namespace = Some(local.to_string());
    }
    imports.push(single);
}
