//! Compilation-based validation of normalized code.

use crate::analysis::{Diagnostic, Project, SourceFile, Target, TypeChecker, TypeKind};
use crate::error::WeldError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Optional-access warnings that do not indicate a broken implementation.
const BENIGN_NOISE: &[&str] = &["possibly 'undefined'", "possibly undefined"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let diagnostics: Vec<Diagnostic> = diagnostics
            .into_iter()
            .filter(|d| !is_benign(d))
            .collect();
        Self {
            is_valid: diagnostics.is_empty(),
            diagnostics,
        }
    }

    /// Flattened, rendered messages.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(Diagnostic::render).collect()
    }
}

fn is_benign(diagnostic: &Diagnostic) -> bool {
    let text = diagnostic.message.flatten();
    BENIGN_NOISE.iter().any(|noise| text.contains(noise))
}

/// Path of the temporary compilation unit for `output_path`, next to it so relative imports resolve.
pub fn staging_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unit");
    output_path.with_file_name(format!("{}.weld-check.ts", stem))
}

/// Removes a staged unit from the project when dropped.
struct StagedUnit<'a> {
    project: &'a Project,
    path: PathBuf,
}

impl<'a> StagedUnit<'a> {
    fn stage(project: &'a Project, path: PathBuf, code: &str) -> Self {
        project.stage(&path, code);
        Self { project, path }
    }
}

impl Drop for StagedUnit<'_> {
    fn drop(&mut self) {
        self.project.unstage(&self.path);
    }
}

/// The registry imports `${Name}Impl` by name, whatever the checker accepts.
fn missing_impl_class(file: &SourceFile, target: &Target) -> Option<Diagnostic> {
    let impl_name = target.impl_name();
    let declared = file.declarations.iter().any(|d| {
        d.exported && d.kind == TypeKind::Class && d.name.as_deref() == Some(impl_name.as_str())
    });
    if declared {
        return None;
    }
    Some(Diagnostic::new(
        None,
        format!(
            "Cannot find class '{}' in generated module. Declare 'export class {} {} {}'.",
            impl_name,
            impl_name,
            target.kind.relation_keyword(),
            target.name
        ),
    ))
}

pub struct Validator {
    project: Arc<Project>,
    checker: Arc<dyn TypeChecker>,
    // stage -> check -> unstage is one critical section on the shared project
    guard: Mutex<()>,
}

impl Validator {
    pub fn new(project: Arc<Project>, checker: Arc<dyn TypeChecker>) -> Self {
        Self {
            project,
            checker,
            guard: Mutex::new(()),
        }
    }

    pub fn checker_name(&self) -> &str {
        self.checker.name()
    }

    pub async fn validate(
        &self,
        code: &str,
        target: &Target,
        output_path: &Path,
    ) -> Result<ValidationResult, WeldError> {
        let _lock = self.guard.lock().await;
        let unit = StagedUnit::stage(&self.project, staging_path(output_path), code);
        let mut diagnostics = self.checker.check(&self.project, &unit.path).await?;
        if let Some(missing) = self
            .project
            .file(&unit.path)
            .and_then(|file| missing_impl_class(&file, target))
        {
            diagnostics.insert(0, missing);
        }
        drop(unit);

        let result = ValidationResult::from_diagnostics(diagnostics);
        debug!(
            target = %target.name,
            checker = self.checker.name(),
            valid = result.is_valid,
            diagnostics = result.diagnostics.len(),
            "Validated candidate"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ConformanceChecker;

    fn setup() -> (Arc<Project>, Target) {
        let project = Arc::new(Project::new("/p"));
        project.add_source(
            Path::new("/p/src/greeter.ts"),
            "export interface Greeter {\n  greet(name: string): string;\n  farewell(name: string): string;\n}\n",
        );
        let target = Target::from_declaration(project.find_type("Greeter").unwrap()).unwrap();
        (project, target)
    }

    #[tokio::test]
    async fn missing_method_is_reported() {
        let (project, target) = setup();
        let validator = Validator::new(project.clone(), Arc::new(ConformanceChecker::new()));
        let code = "import { Greeter } from '../greeter';\n\nexport class GreeterImpl implements Greeter {\n  greet(name: string): string {\n    return name;\n  }\n}\n";
        let output = Path::new("/p/src/generated/GreeterImpl.ts");
        let result = validator.validate(code, &target, output).await.unwrap();
        assert!(!result.is_valid);
        assert!(result.messages().iter().any(|m| m.contains("'farewell'")));

        // the staged unit never lingers
        assert!(!project.contains(&staging_path(output)));
        assert!(project.find_type("GreeterImpl").is_none());
    }

    #[tokio::test]
    async fn complete_implementation_is_valid() {
        let (project, target) = setup();
        let validator = Validator::new(project, Arc::new(ConformanceChecker::new()));
        let code = "export class GreeterImpl implements Greeter {\n  greet(name: string): string { return name; }\n  farewell(name: string): string { return name; }\n}\n";
        let result = validator
            .validate(code, &target, Path::new("/p/src/generated/GreeterImpl.ts"))
            .await
            .unwrap();
        assert!(result.is_valid, "{:?}", result.messages());
    }

    #[tokio::test]
    async fn wrongly_named_class_is_reported() {
        let (project, target) = setup();
        let validator = Validator::new(project, Arc::new(ConformanceChecker::new()));
        let code = "export class FriendlyGreeter implements Greeter {\n  greet(name: string): string { return name; }\n  farewell(name: string): string { return name; }\n}\n";
        let result = validator
            .validate(code, &target, Path::new("/p/src/generated/GreeterImpl.ts"))
            .await
            .unwrap();
        assert!(!result.is_valid);
        assert_eq!(
            result.messages()[0],
            "Cannot find class 'GreeterImpl' in generated module. Declare 'export class GreeterImpl implements Greeter'."
        );
    }

    #[tokio::test]
    async fn unexported_impl_class_is_reported() {
        let (project, target) = setup();
        let validator = Validator::new(project, Arc::new(ConformanceChecker::new()));
        let code = "class GreeterImpl implements Greeter {\n  greet(name: string): string { return name; }\n  farewell(name: string): string { return name; }\n}\n";
        let result = validator
            .validate(code, &target, Path::new("/p/src/generated/GreeterImpl.ts"))
            .await
            .unwrap();
        assert!(!result.is_valid);
        assert!(result.messages()[0].starts_with("Cannot find class 'GreeterImpl'"));
    }

    #[test]
    fn possibly_undefined_noise_is_filtered() {
        let result = ValidationResult::from_diagnostics(vec![
            Diagnostic::new(Some(18048), "'user.name' is possibly 'undefined'."),
            Diagnostic::new(Some(2532), "Object is possibly 'undefined'."),
        ]);
        assert!(result.is_valid);

        let result = ValidationResult::from_diagnostics(vec![
            Diagnostic::new(Some(18048), "'user' is possibly 'undefined'."),
            Diagnostic::new(Some(2339), "Property 'x' does not exist on type 'A'."),
        ]);
        assert!(!result.is_valid);
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn staging_path_is_a_sibling() {
        assert_eq!(
            staging_path(Path::new("/p/out/AImpl.ts")),
            PathBuf::from("/p/out/AImpl.weld-check.ts")
        );
    }
}
