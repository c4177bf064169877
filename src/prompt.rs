//! Generation and repair prompts
//!
//! Pure functions of their inputs: no I/O and no model calls.

use crate::analysis::{DeclarationKind, Diagnostic, Target};
use crate::resolver::{ContextBundle, Origin};
use serde::{Deserialize, Serialize};

/// Everything needed to render a generation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub target_name: String,
    pub declaration_kind: DeclarationKind,
    pub rules: Vec<String>,
    pub context: Vec<ContextSection>,
    pub declaration_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSection {
    pub name: String,
    pub origin: Origin,
    pub locator: String,
    pub text: String,
}

/// A generation request plus the failing attempt it should fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRequest {
    pub request: GenerationRequest,
    pub current_code: String,
    pub diagnostics: Vec<String>,
}

pub fn rules_for(target_name: &str, kind: DeclarationKind) -> Vec<String> {
    let impl_name = format!("{}Impl", target_name);
    let mut rules = vec![format!(
        "The implementation class name must be '{}'",
        impl_name
    )];
    match kind {
        DeclarationKind::Interface => {
            rules.push(format!(
                "The class must be declared as 'export class {} implements {}'",
                impl_name, target_name
            ));
            rules.push(format!(
                "Implement every property and method declared in '{}'",
                target_name
            ));
        }
        DeclarationKind::AbstractBase => {
            rules.push(format!(
                "The class must be declared as 'export class {} extends {}'",
                impl_name, target_name
            ));
            rules.push(format!(
                "Do not redeclare properties inherited from '{}'; access them through 'this' instead",
                target_name
            ));
            rules.push("Implement every abstract method of the base class".to_string());
        }
    }
    rules.push(
        "Implement each method directly; do not add private helper methods that are not required"
            .to_string(),
    );
    rules.push("Do not create unnecessary intermediate objects for simple validation".to_string());
    rules.push(
        "Respond with raw TypeScript code only, with no explanations or prose".to_string(),
    );
    rules
}

pub fn build_request(target: &Target, bundle: &ContextBundle) -> GenerationRequest {
    GenerationRequest {
        target_name: target.name.clone(),
        declaration_kind: target.kind,
        rules: rules_for(&target.name, target.kind),
        context: bundle
            .entries()
            .map(|e| ContextSection {
                name: e.name.clone(),
                origin: e.origin,
                locator: e.locator.clone(),
                text: e.text.clone(),
            })
            .collect(),
        declaration_source: target.declaration.text.clone(),
    }
}

impl GenerationRequest {
    pub fn render(&self) -> String {
        let mut out = String::new();
        match self.declaration_kind {
            DeclarationKind::Interface => out.push_str(&format!(
                "Implement the TypeScript interface '{}'.\n\n",
                self.target_name
            )),
            DeclarationKind::AbstractBase => out.push_str(&format!(
                "Extend the TypeScript abstract class '{}' with a concrete implementation.\n\n",
                self.target_name
            )),
        }

        out.push_str("Declaration:\n```typescript\n");
        out.push_str(self.declaration_source.trim_end());
        out.push_str("\n```\n");

        if !self.context.is_empty() {
            out.push_str("\nReferenced types:\n```typescript\n");
            for section in &self.context {
                let label = match section.origin {
                    Origin::Internal => "internal",
                    Origin::External => "package",
                };
                out.push_str(&format!(
                    "// {} ({}: {})\n{}\n\n",
                    section.name,
                    label,
                    section.locator,
                    section.text.trim_end()
                ));
            }
            let trimmed = out.trim_end().len();
            out.truncate(trimmed);
            out.push_str("\n```\n");
        }

        out.push_str("\nRules:\n");
        for (i, rule) in self.rules.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, rule));
        }
        out
    }
}

pub fn build_prompt(target: &Target, bundle: &ContextBundle) -> String {
    build_request(target, bundle).render()
}

impl RepairRequest {
    pub fn render(&self) -> String {
        let mut out = self.request.render();
        let impl_name = format!("{}Impl", self.request.target_name);
        if is_incomplete(&self.current_code) {
            out.push_str(&format!(
                "\nThe previous response for '{}' was cut off before the class was finished. \
                 Complete the implementation; return the whole class, not just the missing part.\n",
                impl_name
            ));
        } else {
            out.push_str(&format!(
                "\nThe previous implementation of '{}' failed type checking. \
                 Fix the errors below and return the corrected class.\n",
                impl_name
            ));
        }

        out.push_str("\nCurrent code:\n```typescript\n");
        out.push_str(self.current_code.trim_end());
        out.push_str("\n```\n");

        out.push_str("\nErrors:\n");
        if self.diagnostics.is_empty() {
            out.push_str("- (no diagnostics reported)\n");
        }
        for diagnostic in &self.diagnostics {
            out.push_str(&format!("- {}\n", diagnostic));
        }
        out
    }
}

pub fn build_repair_prompt(
    target: &Target,
    bundle: &ContextBundle,
    current_code: &str,
    diagnostics: &[Diagnostic],
) -> String {
    RepairRequest {
        request: build_request(target, bundle),
        current_code: current_code.to_string(),
        diagnostics: diagnostics.iter().map(Diagnostic::render).collect(),
    }
    .render()
}

/// Truncated output: ends on a comment opener, lacks a closing brace, or has unbalanced braces.
pub fn is_incomplete(code: &str) -> bool {
    let trimmed = code.trim_end();
    if trimmed.is_empty() {
        return true;
    }
    let last_line = trimmed.lines().last().unwrap_or("").trim_start();
    if trimmed.ends_with("/*") || trimmed.ends_with("/**") || last_line.starts_with("//") {
        return true;
    }
    if !trimmed.ends_with('}') {
        return true;
    }
    trimmed.matches('{').count() != trimmed.matches('}').count()
}
