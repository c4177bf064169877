//! Registry assembly: one wiring module for every known implementation.
//!
//! Records come from this run's generations and from scanning earlier output.
//! They are deduplicated by target name (later records win) and emitted sorted
//! by registry key, so the module text depends only on the surviving records.

use crate::analysis::project::base_type_name;
use crate::analysis::source::{parse_declarations, MemberKind, TypeDecl, TypeKind};
use crate::analysis::{Project, Target};
use crate::error::WeldError;
use crate::paths::module_specifier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDep {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub target_name: String,
    pub impl_name: String,
    pub impl_path: PathBuf,
    /// Constructor parameter types, in order.
    pub constructor_deps: Vec<String>,
    pub property_deps: Vec<PropertyDep>,
}

impl ServiceRecord {
    pub fn key(&self) -> String {
        registry_key(&self.target_name)
    }
}

/// `UserRepo` -> `userRepo`, `IUserRepo` -> `userRepo`, `HTTPClient` -> `httpClient`.
pub fn registry_key(type_name: &str) -> String {
    let chars: Vec<char> = type_name.chars().collect();
    let chars: &[char] = if chars.len() > 1 && chars[0] == 'I' && chars[1].is_ascii_uppercase() {
        &chars[1..]
    } else {
        &chars
    };
    let upper_run = chars.iter().take_while(|c| c.is_ascii_uppercase()).count();
    let lower_count = match upper_run {
        0 => 0,
        n if n == chars.len() => n,
        1 => 1,
        n => n - 1,
    };
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i < lower_count {
                c.to_ascii_lowercase()
            } else {
                *c
            }
        })
        .collect()
}

/// Build a record for freshly generated code.
///
/// Marker-decorated properties declared on an abstract base are inherited, so
/// they are injected into the implementation too.
pub fn record_from_code(
    target: &Target,
    impl_path: &Path,
    code: &str,
    marker: &str,
) -> ServiceRecord {
    let impl_name = target.impl_name();
    let class = parse_declarations(impl_path, code)
        .into_iter()
        .find(|d| d.name.as_deref() == Some(impl_name.as_str()));
    let base = (target.declaration.kind == TypeKind::AbstractClass).then_some(&target.declaration);
    build_record(
        target.name.clone(),
        impl_name,
        impl_path.to_path_buf(),
        class.as_ref(),
        base,
        marker,
    )
}

fn build_record(
    target_name: String,
    impl_name: String,
    impl_path: PathBuf,
    class: Option<&TypeDecl>,
    base: Option<&TypeDecl>,
    marker: &str,
) -> ServiceRecord {
    let constructor_deps = class
        .and_then(|c| c.members.iter().find(|m| m.kind == MemberKind::Constructor))
        .map(|ctor| {
            ctor.params
                .iter()
                .filter_map(|p| p.type_text.as_deref().and_then(base_type_name))
                .collect()
        })
        .unwrap_or_default();

    let mut property_deps: Vec<PropertyDep> = Vec::new();
    for decl in base.into_iter().chain(class) {
        for member in &decl.members {
            if member.kind != MemberKind::Property || !member.has_decorator(marker) {
                continue;
            }
            let Some(type_name) = member.type_text.as_deref().and_then(base_type_name) else {
                continue;
            };
            if property_deps.iter().any(|d| d.name == member.name) {
                continue;
            }
            property_deps.push(PropertyDep {
                name: member.name.clone(),
                type_name,
            });
        }
    }

    ServiceRecord {
        target_name,
        impl_name,
        impl_path,
        constructor_deps,
        property_deps,
    }
}

/// Recover records from `*Impl.ts` modules already in `out_dir`.
///
/// With a project, marker-decorated properties of an abstract base are
/// recovered as well.
pub fn scan_existing(
    out_dir: &Path,
    marker: &str,
    project: Option<&Project>,
) -> Result<Vec<ServiceRecord>, WeldError> {
    if !out_dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(out_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("Impl.ts"))
        })
        .collect();
    paths.sort();

    let mut records = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(&path)?;
        for class in parse_declarations(&path, &text) {
            if class.kind != TypeKind::Class || !class.exported {
                continue;
            }
            let Some(impl_name) = class.name.clone() else {
                continue;
            };
            let Some(target_name) = impl_name.strip_suffix("Impl").map(str::to_string) else {
                continue;
            };
            if target_name.is_empty() {
                continue;
            }
            let base = project
                .and_then(|p| p.find_type(&target_name))
                .filter(|d| d.kind == TypeKind::AbstractClass);
            records.push(build_record(
                target_name,
                impl_name,
                path.clone(),
                Some(&class),
                base.as_ref(),
                marker,
            ));
        }
    }
    debug!(dir = %out_dir.display(), records = records.len(), "Scanned existing implementations");
    Ok(records)
}

/// Last record per target name wins; the result is sorted by registry key.
pub fn deduplicate(records: &[ServiceRecord]) -> Vec<ServiceRecord> {
    let mut by_target: BTreeMap<&str, &ServiceRecord> = BTreeMap::new();
    for record in records {
        by_target.insert(&record.target_name, record);
    }
    let mut by_key: BTreeMap<String, ServiceRecord> = BTreeMap::new();
    for record in by_target.into_values() {
        if let Some(previous) = by_key.insert(record.key(), record.clone()) {
            warn!(
                key = %record.key(),
                replaced = %previous.target_name,
                kept = %record.target_name,
                "Two services share a registry key"
            );
        }
    }
    by_key.into_values().collect()
}

/// Emit the wiring module. Import specifiers are relative to `registry_dir`.
pub fn assemble(records: &[ServiceRecord], registry_dir: &Path) -> String {
    let services = deduplicate(records);
    let mut out = String::new();

    out.push_str("// Generated by weld. Do not edit.\n");
    for record in &services {
        let _ = writeln!(
            out,
            "import {{ {} }} from '{}';",
            record.impl_name,
            module_specifier(registry_dir, &record.impl_path)
        );
    }
    if !services.is_empty() {
        out.push('\n');
    }

    out.push_str("export interface ServiceMap {\n");
    for record in &services {
        let _ = writeln!(out, "  {}: {};", record.key(), record.impl_name);
    }
    out.push_str("}\n\n");
    out.push_str("export type ServiceName = keyof ServiceMap;\n\n");

    out.push_str(ERRORS);

    out.push_str("const instances = new Map<string, unknown>();\n");
    out.push_str("const constructing: string[] = [];\n\n");

    let registered: BTreeSet<String> = services.iter().map(ServiceRecord::key).collect();
    out.push_str("const factories: { [K in ServiceName]: () => ServiceMap[K] } = {\n");
    for record in &services {
        out.push_str(&factory(record, &registered));
    }
    out.push_str("};\n\n");

    out.push_str(LOOKUP);
    out
}

/// Only registered dependencies are resolved; anything else is left to the class itself.
fn factory(record: &ServiceRecord, registered: &BTreeSet<String>) -> String {
    let args: Vec<String> = record
        .constructor_deps
        .iter()
        .map(|dep| {
            let key = registry_key(dep);
            if registered.contains(&key) {
                format!("resolve('{}')", key)
            } else {
                warn!(
                    service = %record.target_name,
                    dependency = %dep,
                    "Constructor dependency is not a registered service"
                );
                "undefined as any".to_string()
            }
        })
        .collect();
    let construct = format!("new {}({})", record.impl_name, args.join(", "));
    let properties: Vec<(&PropertyDep, String)> = record
        .property_deps
        .iter()
        .filter_map(|dep| {
            let key = registry_key(&dep.type_name);
            if registered.contains(&key) {
                Some((dep, key))
            } else {
                warn!(
                    service = %record.target_name,
                    property = %dep.name,
                    dependency = %dep.type_name,
                    "Injected property is not a registered service"
                );
                None
            }
        })
        .collect();
    if properties.is_empty() {
        return format!("  {}: () => {},\n", record.key(), construct);
    }
    let mut body = format!("  {}: () => {{\n    const instance = {};\n", record.key(), construct);
    for (dep, key) in properties {
        let _ = writeln!(
            body,
            "    Object.defineProperty(instance, '{}', {{ get: () => resolve('{}'), configurable: true, enumerable: true }});",
            dep.name,
            key
        );
    }
    body.push_str("    return instance;\n  },\n");
    body
}

const ERRORS: &str = "export class NotRegisteredError extends Error {
  constructor(public readonly serviceName: string) {
    super(`Service '${serviceName}' is not registered`);
    this.name = 'NotRegisteredError';
  }
}

export class CircularDependencyError extends Error {
  constructor(public readonly cycle: string[]) {
    super(`Circular constructor dependency: ${cycle.join(' -> ')}`);
    this.name = 'CircularDependencyError';
  }
}

";

const LOOKUP: &str = "function isRegistered(name: string): name is ServiceName {
  return Object.prototype.hasOwnProperty.call(factories, name);
}

function resolve(name: string): any {
  if (!isRegistered(name)) {
    throw new NotRegisteredError(name);
  }
  if (instances.has(name)) {
    return instances.get(name);
  }
  const start = constructing.indexOf(name);
  if (start !== -1) {
    throw new CircularDependencyError([...constructing.slice(start), name]);
  }
  constructing.push(name);
  try {
    const instance = factories[name]();
    instances.set(name, instance);
    return instance;
  } finally {
    constructing.pop();
  }
}

export function get<K extends ServiceName>(name: K): ServiceMap[K] {
  return resolve(name);
}
";

/// Write the module, creating the directory if needed.
pub fn write_registry(path: &Path, text: &str) -> Result<(), WeldError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    debug!(path = %path.display(), "Wrote registry module");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, deps: &[&str]) -> ServiceRecord {
        ServiceRecord {
            target_name: name.to_string(),
            impl_name: format!("{}Impl", name),
            impl_path: PathBuf::from(format!("/p/src/generated/{}Impl.ts", name)),
            constructor_deps: deps.iter().map(|d| d.to_string()).collect(),
            property_deps: Vec::new(),
        }
    }

    #[test]
    fn registry_keys() {
        assert_eq!(registry_key("Greeter"), "greeter");
        assert_eq!(registry_key("UserRepo"), "userRepo");
        assert_eq!(registry_key("IUserRepo"), "userRepo");
        assert_eq!(registry_key("HTTPClient"), "httpClient");
        assert_eq!(registry_key("DB"), "db");
        assert_eq!(registry_key("Index"), "index");
    }

    #[test]
    fn later_records_win() {
        let dir = Path::new("/p/src/generated");
        let v1 = record("X", &[]);
        let mut v2 = record("X", &["Logger"]);
        v2.impl_path = PathBuf::from("/p/src/generated/v2/XImpl.ts");
        assert_eq!(
            assemble(&[v1, v2.clone()], dir),
            assemble(&[v2.clone()], dir)
        );
        let logger = record("Logger", &[]);
        assert!(assemble(&[v2, logger], dir).contains("new XImpl(resolve('logger'))"));
    }

    #[test]
    fn output_independent_of_input_order() {
        let dir = Path::new("/p/src/generated");
        let a = record("Alpha", &[]);
        let b = record("Beta", &["Alpha"]);
        assert_eq!(
            assemble(&[a.clone(), b.clone()], dir),
            assemble(&[b, a], dir)
        );
    }

    #[test]
    fn module_shape() {
        let mut repo = record("UserRepo", &["Database"]);
        repo.property_deps.push(PropertyDep {
            name: "logger".to_string(),
            type_name: "ILogger".to_string(),
        });
        let text = assemble(
            &[repo, record("Database", &[]), record("Logger", &[])],
            Path::new("/p/src/generated"),
        );
        assert!(text.contains("import { UserRepoImpl } from './UserRepoImpl';"));
        assert!(text.contains("  userRepo: UserRepoImpl;"));
        assert!(text.contains("const instance = new UserRepoImpl(resolve('database'));"));
        assert!(text.contains(
            "Object.defineProperty(instance, 'logger', { get: () => resolve('logger'), configurable: true, enumerable: true });"
        ));
        assert!(text.contains("export class NotRegisteredError extends Error"));
        assert!(text.contains("export class CircularDependencyError extends Error"));
        assert!(text.contains("export function get<K extends ServiceName>"));
    }

    #[test]
    fn unregistered_dependencies_are_not_resolved() {
        let mut client = record("ApiClient", &["string", "Clock"]);
        client.property_deps.push(PropertyDep {
            name: "fetcher".to_string(),
            type_name: "Fetch".to_string(),
        });
        let text = assemble(
            &[client, record("Clock", &[])],
            Path::new("/p/src/generated"),
        );
        assert!(text.contains(
            "  apiClient: () => new ApiClientImpl(undefined as any, resolve('clock')),"
        ));
        assert!(!text.contains("resolve('string')"));
        assert!(!text.contains("'fetcher'"));
    }

    #[test]
    fn record_from_generated_code() {
        let project = Project::new("/p");
        project.add_source(
            Path::new("/p/src/repo.ts"),
            "export abstract class Repo {\n  @Inject db: Database;\n  abstract find(id: string): string;\n}\n",
        );
        let target = Target::from_declaration(project.find_type("Repo").unwrap()).unwrap();
        let code = "export class RepoImpl extends Repo {\n  constructor(private readonly clock: Clock) {\n    super();\n  }\n  find(id: string): string { return id; }\n}\n";
        let record = record_from_code(
            &target,
            Path::new("/p/src/generated/RepoImpl.ts"),
            code,
            "Inject",
        );
        assert_eq!(record.constructor_deps, vec!["Clock".to_string()]);
        assert_eq!(
            record.property_deps,
            vec![PropertyDep {
                name: "db".to_string(),
                type_name: "Database".to_string()
            }]
        );
    }

    #[test]
    fn scans_previous_output() {
        let temp = TempDir::new().unwrap();
        let out = temp.path();
        std::fs::write(
            out.join("GreeterImpl.ts"),
            "import { Greeter } from '../greeter';\n\nexport class GreeterImpl implements Greeter {\n  @Inject clock: Clock;\n  greet(name: string): string { return name; }\n}\n",
        )
        .unwrap();
        std::fs::write(out.join("container.ts"), "// registry\n").unwrap();
        std::fs::write(out.join("GreeterImpl.weld-check.ts"), "export class GreeterImpl {}\n")
            .unwrap();

        let records = scan_existing(out, "Inject", None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_name, "Greeter");
        assert_eq!(records[0].property_deps[0].type_name, "Clock");

        assert!(scan_existing(&out.join("missing"), "Inject", None)
            .unwrap()
            .is_empty());
    }
}
