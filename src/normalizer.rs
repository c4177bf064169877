//! Code normalization
//!
//! Reshapes raw model output into a plausible implementation module:
//!
//! 1. take the first fenced code block, or the raw text
//! 2. extract the `${Name}Impl` class, falling back to the whole text
//! 3. fix the relation keyword (`implements` for interfaces, `extends` for abstract bases)
//! 4. rebuild the import section from the declaration's module imports plus
//!    whatever the body visibly references
//! 5. drop property redeclarations of members an abstract base already defines
//!
//! Normalizing already-normalized code is a no-op.

pub mod imports;

use crate::analysis::project::base_type_name;
use crate::analysis::source::{self, split_top_level, MemberKind};
use crate::analysis::{DeclarationKind, Project, Target};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[\w+-]*[ \t]*\r?\n(.*?)```").unwrap());

static IMPORT_STMT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*import\s+(?:type\s+)?[^;'"]*?\s*from\s*['"][^'"]+['"][ \t]*;?[ \t]*(?:\r?\n|$)"#,
    )
    .unwrap()
});

static SIDE_EFFECT_STMT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*['"][^'"]+['"][ \t]*;?[ \t]*(?:\r?\n|$)"#).unwrap()
});

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^(?P<prefix>.*?\bclass\s+[A-Za-z_$][\w$]*(?:\s*<.*?>)?)(?:\s+extends\s+(?P<ext>.*?))?(?:\s+implements\s+(?P<imp>.*?))?\s*$",
    )
    .unwrap()
});

static PROPERTY_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:@[\w$]+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected|readonly|declare|override)\s+)*([A-Za-z_$][\w$]*)\s*[?!]?\s*(?::|=|;|$)",
    )
    .unwrap()
});

/// Normalized code plus how much of it was recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub code: String,
    /// The expected implementation class was located by name.
    pub class_found: bool,
    /// Referenced identifiers no import could be found for.
    pub unresolved: Vec<String>,
}

impl Normalized {
    pub fn is_confident(&self) -> bool {
        self.class_found && self.unresolved.is_empty()
    }
}

pub struct Normalizer<'a> {
    project: &'a Project,
}

impl<'a> Normalizer<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    pub fn normalize(&self, raw: &str, target: &Target, output_path: &Path) -> String {
        self.normalize_detailed(raw, target, output_path).code
    }

    pub fn normalize_detailed(&self, raw: &str, target: &Target, output_path: &Path) -> Normalized {
        let extracted = extract_code_block(raw);
        let model_imports = source::parse_imports(&extracted);
        let without_imports = strip_import_statements(&extracted);

        let (mut body, class_found) = match extract_class(&without_imports, &target.impl_name()) {
            Some(class) => (class, true),
            None => (without_imports.trim().to_string(), false),
        };
        if class_found {
            body = rewrite_class_header(&body, &target.name, target.kind);
            if target.kind == DeclarationKind::AbstractBase {
                body = strip_base_properties(&body, &inherited_properties(target));
            }
        }

        let cleaned = blank_strings(&source::strip_comments(&body));
        let declared_in_body: BTreeSet<String> = source::parse_declarations(output_path, &body)
            .into_iter()
            .filter_map(|d| d.name)
            .collect();
        let output_dir = output_path.parent().unwrap_or(Path::new("."));
        let plan = imports::reconcile(
            self.project,
            target,
            output_dir,
            &cleaned,
            &model_imports,
            &declared_in_body,
        );

        let import_block = plan.render();
        let body = body.trim();
        let code = if import_block.is_empty() {
            format!("{}\n", body)
        } else {
            format!("{}\n\n{}\n", import_block, body)
        };

        if !class_found || !plan.unresolved.is_empty() {
            debug!(
                target = %target.name,
                class_found,
                unresolved = ?plan.unresolved,
                "Low-confidence normalization"
            );
        }
        Normalized {
            code,
            class_found,
            unresolved: plan.unresolved,
        }
    }
}

/// First fenced block, an unterminated fence's remainder, or the raw text.
pub fn extract_code_block(raw: &str) -> String {
    if let Some(caps) = FENCE_RE.captures(raw) {
        return caps[1].to_string();
    }
    if let Some(open) = raw.find("```") {
        let after = &raw[open + 3..];
        let rest = after.find('\n').map(|i| &after[i + 1..]).unwrap_or("");
        return rest.to_string();
    }
    raw.to_string()
}

pub fn strip_import_statements(code: &str) -> String {
    let without = IMPORT_STMT_RE.replace_all(code, "");
    SIDE_EFFECT_STMT_RE.replace_all(&without, "").into_owned()
}

/// The `class <impl_name>` declaration through its closing brace, or to the end when truncated.
pub fn extract_class(code: &str, impl_name: &str) -> Option<String> {
    let pattern = format!(
        r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+{}\b",
        regex::escape(impl_name)
    );
    let re = Regex::new(&pattern).ok()?;
    let cleaned = source::strip_comments(code);
    let found = re.find(&cleaned)?;
    let start = found.start() + (cleaned[found.start()..].len() - cleaned[found.start()..].trim_start().len());

    let mut angle = 0i32;
    let mut open = None;
    for (offset, ch) in cleaned[found.end()..].char_indices() {
        match ch {
            '<' => angle += 1,
            '>' => angle -= 1,
            '{' if angle <= 0 => {
                open = Some(found.end() + offset);
                break;
            }
            _ => {}
        }
    }
    let end = match open.and_then(|o| source::matching_close(&cleaned, o)) {
        Some(close) => close + 1,
        None => code.len(),
    };
    Some(code[start..end].to_string())
}

/// Force the relation to the target and make sure the class is exported.
pub fn rewrite_class_header(class_text: &str, target_name: &str, kind: DeclarationKind) -> String {
    let open = match class_text.find('{') {
        Some(open) => open,
        None => return class_text.to_string(),
    };
    let header = &class_text[..open];
    let caps = match HEADER_RE.captures(header.trim()) {
        Some(caps) => caps,
        None => return class_text.to_string(),
    };

    let mut prefix = caps["prefix"].split_whitespace().collect::<Vec<_>>().join(" ");
    if !prefix.starts_with("export") {
        prefix = format!("export {}", prefix);
    }
    let mut ext = caps
        .name("ext")
        .map(|m| m.as_str().trim().to_string())
        .filter(|e| !e.is_empty());
    let mut imp: Vec<String> = caps
        .name("imp")
        .map(|m| {
            split_top_level(m.as_str(), ',')
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let is_target = |t: &str| base_type_name(t).as_deref() == Some(target_name);
    match kind {
        DeclarationKind::AbstractBase => {
            let from_imp = imp.iter().position(|t| is_target(t)).map(|i| imp.remove(i));
            if !ext.as_deref().map_or(false, |e| is_target(e)) {
                ext = Some(from_imp.unwrap_or_else(|| target_name.to_string()));
            }
        }
        DeclarationKind::Interface => {
            if ext.as_deref().map_or(false, |e| is_target(e)) {
                if let Some(moved) = ext.take() {
                    imp.insert(0, moved);
                }
            }
            if !imp.iter().any(|t| is_target(t)) {
                imp.insert(0, target_name.to_string());
            }
        }
    }

    let mut out = prefix;
    if let Some(ext) = ext {
        out.push_str(" extends ");
        out.push_str(&ext);
    }
    if !imp.is_empty() {
        out.push_str(" implements ");
        out.push_str(&imp.join(", "));
    }
    out.push(' ');
    out.push_str(&class_text[open..]);
    out
}

/// Property names an abstract base already defines, including constructor parameter properties.
fn inherited_properties(target: &Target) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for member in &target.declaration.members {
        match member.kind {
            MemberKind::Property if !member.is_static => {
                names.insert(member.name.clone());
            }
            MemberKind::Constructor => {
                names.extend(
                    member
                        .params
                        .iter()
                        .filter(|p| p.is_property)
                        .map(|p| p.name.clone()),
                );
            }
            _ => {}
        }
    }
    names
}

/// Remove class-level property declarations of `names`, including multi-line initializers.
pub fn strip_base_properties(class_text: &str, names: &BTreeSet<String>) -> String {
    if names.is_empty() {
        return class_text.to_string();
    }
    let cleaned = blank_strings(&source::strip_comments(class_text));
    let mut kept = Vec::new();
    let mut depth = 0i32;
    let mut skipping = false;
    for (line, code) in class_text.lines().zip(cleaned.lines()) {
        let before = depth;
        depth += code.matches('{').count() as i32 - code.matches('}').count() as i32;
        if skipping {
            if depth <= 1 {
                skipping = false;
            }
            continue;
        }
        if before == 1 {
            if let Some(caps) = PROPERTY_DECL_RE.captures(code) {
                if names.contains(&caps[1]) {
                    skipping = depth > 1;
                    continue;
                }
            }
        }
        kept.push(line);
    }
    kept.join("\n")
}

/// Replace string literal contents with spaces, keeping quotes and line breaks.
pub fn blank_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in text.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                } else if ch == '\\' {
                    escaped = true;
                    out.push(' ');
                } else if ch == q {
                    quote = None;
                    out.push(ch);
                } else if ch == '\n' {
                    if q != '`' {
                        quote = None;
                    }
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            None => {
                if matches!(ch, '\'' | '"' | '`') {
                    quote = Some(ch);
                }
                out.push(ch);
            }
        }
    }
    out
}
