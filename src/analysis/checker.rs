//! Compilation diagnostics for staged units.

use crate::analysis::project::Project;
use crate::analysis::source::{self, MemberKind, TypeDecl, TypeKind};
use crate::error::WeldError;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

static TSC_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\((\d+),(\d+)\): (error|warning) TS(\d+): (.*)$").unwrap()
});

/// A possibly nested compiler message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticMessage {
    Text(String),
    Chain {
        text: String,
        next: Vec<DiagnosticMessage>,
    },
}

impl DiagnosticMessage {
    /// Collapse a message chain into one string, one indented line per level.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        self.flatten_into(&mut out, 0);
        out
    }

    fn flatten_into(&self, out: &mut String, depth: usize) {
        if depth > 0 {
            out.push('\n');
            out.push_str(&"  ".repeat(depth));
        }
        match self {
            DiagnosticMessage::Text(text) => out.push_str(text),
            DiagnosticMessage::Chain { text, next } => {
                out.push_str(text);
                for child in next {
                    child.flatten_into(out, depth + 1);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: Option<u32>,
    pub line: Option<u32>,
    pub message: DiagnosticMessage,
}

impl Diagnostic {
    pub fn new(code: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            code,
            line: None,
            message: DiagnosticMessage::Text(message.into()),
        }
    }

    pub fn chain(code: Option<u32>, text: impl Into<String>, next: Vec<String>) -> Self {
        Self {
            code,
            line: None,
            message: DiagnosticMessage::Chain {
                text: text.into(),
                next: next.into_iter().map(DiagnosticMessage::Text).collect(),
            },
        }
    }

    /// `TS2420 (line 3): message` with the chain flattened.
    pub fn render(&self) -> String {
        let mut prefix = String::new();
        if let Some(code) = self.code {
            prefix.push_str(&format!("TS{}", code));
        }
        if let Some(line) = self.line {
            if !prefix.is_empty() {
                prefix.push(' ');
            }
            prefix.push_str(&format!("(line {})", line));
        }
        if prefix.is_empty() {
            self.message.flatten()
        } else {
            format!("{}: {}", prefix, self.message.flatten())
        }
    }
}

/// Produces diagnostics for a unit already staged in the project.
#[async_trait]
pub trait TypeChecker: Send + Sync {
    async fn check(&self, project: &Project, unit: &Path) -> Result<Vec<Diagnostic>, WeldError>;

    fn name(&self) -> &str;
}

const PROJECT_TSCONFIG: &str = "tsconfig.json";

/// Runs the TypeScript compiler over the staged unit using the project's `tsconfig.json`.
pub struct TscChecker {
    command: Vec<String>,
}

impl TscChecker {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

/// Files written for one compiler run; removed on drop.
struct ScratchFiles(Vec<PathBuf>);

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.0 {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
                }
            }
        }
    }
}

#[async_trait]
impl TypeChecker for TscChecker {
    async fn check(&self, project: &Project, unit: &Path) -> Result<Vec<Diagnostic>, WeldError> {
        let file = project
            .file(unit)
            .ok_or_else(|| WeldError::Analysis(format!("Unit not staged: {}", unit.display())))?;
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| WeldError::Config("Type checker command is empty".to_string()))?;

        let root = project.root();
        let stem = unit
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unit")
            .replace('.', "-");
        let tsconfig_path = root.join(format!("tsconfig.weld-{}.json", stem));
        let relative_unit = unit.strip_prefix(root).unwrap_or(unit);

        let mut scratch = ScratchFiles(Vec::new());
        if let Some(parent) = unit.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(unit, &file.text)?;
        scratch.0.push(unit.to_path_buf());

        let tsconfig = json!({
            "extends": format!("./{}", PROJECT_TSCONFIG),
            "compilerOptions": { "noEmit": true },
            "include": [relative_unit.to_string_lossy()],
        });
        std::fs::write(&tsconfig_path, serde_json::to_string_pretty(&tsconfig)?)?;
        scratch.0.push(tsconfig_path.clone());

        debug!(unit = %unit.display(), checker = %program, "Running type checker");
        let output = tokio::process::Command::new(program)
            .args(args)
            .arg("-p")
            .arg(&tsconfig_path)
            .arg("--pretty")
            .arg("false")
            .current_dir(root)
            .output()
            .await
            .map_err(|e| WeldError::Analysis(format!("Failed to run {}: {}", program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let unit_name = relative_unit.to_string_lossy().replace('\\', "/");
        let mut diagnostics = parse_tsc_output(&stdout, &unit_name);

        if diagnostics.is_empty() && !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            // errors confined to other modules do not count against the unit
            if !detail.is_empty() && parse_tsc_output(&stdout, "").is_empty() {
                diagnostics.push(Diagnostic::new(None, detail));
            }
        }
        Ok(diagnostics)
    }

    fn name(&self) -> &str {
        "tsc"
    }
}

/// Parse `--pretty false` compiler output, keeping diagnostics whose file ends with `unit`.
///
/// Indented lines following a diagnostic continue its message chain.
pub fn parse_tsc_output(output: &str, unit: &str) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut keep_current = false;
    for line in output.lines() {
        if let Some(caps) = TSC_LINE_RE.captures(line) {
            let file = caps[1].replace('\\', "/");
            keep_current = file.ends_with(unit);
            if keep_current {
                diagnostics.push(Diagnostic {
                    code: caps[5].parse().ok(),
                    line: caps[2].parse().ok(),
                    message: DiagnosticMessage::Text(caps[6].to_string()),
                });
            }
        } else if keep_current && line.starts_with(char::is_whitespace) && !line.trim().is_empty()
        {
            if let Some(last) = diagnostics.last_mut() {
                let text = line.trim().to_string();
                match &mut last.message {
                    DiagnosticMessage::Text(head) => {
                        last.message = DiagnosticMessage::Chain {
                            text: std::mem::take(head),
                            next: vec![DiagnosticMessage::Text(text)],
                        };
                    }
                    DiagnosticMessage::Chain { next, .. } => {
                        next.push(DiagnosticMessage::Text(text));
                    }
                }
            }
        }
    }
    diagnostics
}

/// Offline structural check: class presence, brace balance and contract coverage.
///
/// Uses the compiler's wording so repair prompts read the same with either backend.
#[derive(Debug, Default)]
pub struct ConformanceChecker;

impl ConformanceChecker {
    pub fn new() -> Self {
        Self
    }

    fn check_class(project: &Project, class: &TypeDecl, diagnostics: &mut Vec<Diagnostic>) {
        let class_name = class.display_name();
        let mut declared: Vec<&str> = class.members.iter().map(|m| m.name.as_str()).collect();
        for member in &class.members {
            if member.kind == MemberKind::Constructor {
                declared.extend(
                    member
                        .params
                        .iter()
                        .filter(|p| p.is_property)
                        .map(|p| p.name.as_str()),
                );
            }
        }

        for parent_name in &class.heritage {
            let parent = match project.find_type(parent_name) {
                Some(parent) => parent,
                None => {
                    diagnostics.push(Diagnostic::new(
                        Some(2304),
                        format!("Cannot find name '{}'.", parent_name),
                    ));
                    continue;
                }
            };
            match parent.kind {
                TypeKind::Interface => {
                    let missing: Vec<String> = parent
                        .members
                        .iter()
                        .filter(|m| !m.optional && m.kind != MemberKind::Constructor)
                        .filter(|m| !declared.contains(&m.name.as_str()))
                        .map(|m| {
                            format!(
                                "Property '{}' is missing in type '{}' but required in type '{}'.",
                                m.name, class_name, parent_name
                            )
                        })
                        .collect();
                    if !missing.is_empty() {
                        diagnostics.push(Diagnostic::chain(
                            Some(2420),
                            format!(
                                "Class '{}' incorrectly implements interface '{}'.",
                                class_name, parent_name
                            ),
                            missing,
                        ));
                    }
                }
                TypeKind::AbstractClass if class.kind == TypeKind::Class => {
                    for member in parent.members.iter().filter(|m| m.is_abstract) {
                        if !declared.contains(&member.name.as_str()) {
                            diagnostics.push(Diagnostic::new(
                                Some(2515),
                                format!(
                                    "Non-abstract class '{}' does not implement inherited abstract member '{}' from class '{}'.",
                                    class_name, member.name, parent_name
                                ),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl TypeChecker for ConformanceChecker {
    async fn check(&self, project: &Project, unit: &Path) -> Result<Vec<Diagnostic>, WeldError> {
        let file = project
            .file(unit)
            .ok_or_else(|| WeldError::Analysis(format!("Unit not staged: {}", unit.display())))?;
        let mut diagnostics = Vec::new();

        if !braces_balanced(&file.text) {
            diagnostics.push(Diagnostic::new(Some(1005), "'}' expected."));
        }

        let classes: Vec<&TypeDecl> = file
            .declarations
            .iter()
            .filter(|d| matches!(d.kind, TypeKind::Class | TypeKind::AbstractClass))
            .collect();
        if classes.is_empty() {
            diagnostics.push(Diagnostic::new(
                None,
                "No class declaration found in generated module.",
            ));
        }
        for class in classes {
            Self::check_class(project, class, &mut diagnostics);
        }
        Ok(diagnostics)
    }

    fn name(&self) -> &str {
        "conformance"
    }
}

/// Brace counts match once strings and comments are ignored.
pub fn braces_balanced(text: &str) -> bool {
    let cleaned = source::strip_comments(text);
    let bytes = cleaned.as_bytes();
    let mut depth = 0i64;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
        i += 1;
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with(unit: &str) -> (Project, PathBuf) {
        let project = Project::new("/p");
        project.add_source(
            Path::new("/p/src/greeter.ts"),
            "export interface Greeter {\n  greet(name: string): string;\n  farewell(name: string): string;\n  nickname?: string;\n}\n\nexport abstract class Base {\n  abstract run(): void;\n  helper(): void {}\n}\n",
        );
        let path = PathBuf::from("/p/src/generated/Unit.ts");
        project.stage(&path, unit);
        (project, path)
    }

    #[tokio::test]
    async fn reports_missing_interface_member() {
        let (project, path) = project_with(
            "import { Greeter } from '../greeter';\n\nexport class GreeterImpl implements Greeter {\n  greet(name: string): string {\n    return `hi ${name}`;\n  }\n}\n",
        );
        let diagnostics = ConformanceChecker::new().check(&project, &path).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        let text = diagnostics[0].render();
        assert!(text.starts_with("TS2420"));
        assert!(text.contains("Property 'farewell' is missing"));
        assert!(!text.contains("nickname"));
    }

    #[tokio::test]
    async fn reports_unimplemented_abstract_member() {
        let (project, path) = project_with("export class BaseImpl extends Base {\n}\n");
        let diagnostics = ConformanceChecker::new().check(&project, &path).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(2515));
        assert!(diagnostics[0].render().contains("'run'"));
    }

    #[tokio::test]
    async fn complete_implementation_is_clean() {
        let (project, path) = project_with(
            "export class GreeterImpl implements Greeter {\n  greet(name: string): string { return name; }\n  farewell(name: string): string { return name; }\n}\n",
        );
        let diagnostics = ConformanceChecker::new().check(&project, &path).await.unwrap();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[tokio::test]
    async fn truncated_code_reports_missing_brace() {
        let (project, path) = project_with(
            "export class GreeterImpl implements Greeter {\n  greet(name: string): string {\n    return name;\n",
        );
        let diagnostics = ConformanceChecker::new().check(&project, &path).await.unwrap();
        assert!(diagnostics.iter().any(|d| d.code == Some(1005)));
    }

    #[test]
    fn parses_compiler_output_with_chains() {
        let output = "src/generated/GreeterImpl.ts(3,14): error TS2420: Class 'GreeterImpl' incorrectly implements interface 'Greeter'.\n  Property 'farewell' is missing in type 'GreeterImpl' but required in type 'Greeter'.\nsrc/other.ts(1,1): error TS2304: Cannot find name 'x'.\n  unrelated continuation\nsrc/generated/GreeterImpl.ts(9,5): error TS18048: 'user' is possibly 'undefined'.\n";
        let diagnostics = parse_tsc_output(output, "src/generated/GreeterImpl.ts");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].code, Some(2420));
        assert_eq!(diagnostics[0].line, Some(3));
        assert_eq!(
            diagnostics[0].message.flatten(),
            "Class 'GreeterImpl' incorrectly implements interface 'Greeter'.\n  Property 'farewell' is missing in type 'GreeterImpl' but required in type 'Greeter'."
        );
        assert_eq!(diagnostics[1].code, Some(18048));
    }

    #[tokio::test]
    async fn compiler_needs_a_command() {
        let (project, path) = project_with("export class GreeterImpl implements Greeter {}\n");
        let err = TscChecker::new(Vec::new()).check(&project, &path).await.unwrap_err();
        assert!(matches!(err, WeldError::Config(_)));

        let missing = TscChecker::new(vec!["tsc".to_string()])
            .check(&project, Path::new("/p/src/generated/Other.ts"))
            .await
            .unwrap_err();
        assert!(missing.to_string().contains("Unit not staged"));
    }

    #[test]
    fn brace_balance() {
        assert!(braces_balanced("class A { m() { return '}'; } }"));
        assert!(!braces_balanced("class A { m() {"));
        assert!(!braces_balanced("}{"));
    }
}
