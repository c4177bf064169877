//! TypeScript source scanning: imports, top-level declarations and their members.
//!
//! This is a discovery scanner, not a parser. It understands enough of the
//! grammar to find declarations, their bodies and member signatures; type
//! checking is left to a [`TypeChecker`](super::checker::TypeChecker).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(type\s+)?([^;'"]*?)\s*from\s*['"]([^'"]+)['"][ \t]*;?"#)
        .unwrap()
});

static SIDE_EFFECT_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"]+)['"][ \t]*;?"#).unwrap());

static DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(export\s+)?(default\s+)?(?:declare\s+)?(abstract\s+)?(?:const\s+)?(class|interface|enum|type)\b[ \t]*([A-Za-z_$][\w$]*)?",
    )
    .unwrap()
});

static DECORATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z_$][\w$]*)\s*(\([^)]*\))?\s*").unwrap());

static METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_$#][\w$]*)(\?)?\s*(<[^(]*>)?\s*\(").unwrap());

static PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_$#][\w$]*)([?!])?\s*([:=]|$)").unwrap());

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "readonly",
    "static",
    "abstract",
    "override",
    "declare",
    "async",
    "get",
    "set",
];

/// Kind of a top-level type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Interface,
    AbstractClass,
    Class,
    Enum,
    TypeAlias,
}

/// Kind of a generation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclarationKind {
    Interface,
    AbstractBase,
}

impl DeclarationKind {
    /// Inheritance keyword an implementation class must use.
    pub fn relation_keyword(self) -> &'static str {
        match self {
            DeclarationKind::Interface => "implements",
            DeclarationKind::AbstractBase => "extends",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    /// Binding introduced in the importing module.
    pub fn local(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// One `import ... from '...'` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub specifier: String,
    pub default: Option<String>,
    pub named: Vec<ImportedName>,
    pub namespace: Option<String>,
    pub type_only: bool,
}

impl ImportDecl {
    pub fn named(specifier: impl Into<String>, names: &[&str]) -> Self {
        Self {
            specifier: specifier.into(),
            default: None,
            named: names
                .iter()
                .map(|name| ImportedName {
                    name: name.to_string(),
                    alias: None,
                })
                .collect(),
            namespace: None,
            type_only: false,
        }
    }

    pub fn is_relative(&self) -> bool {
        self.specifier.starts_with('.')
    }

    /// Every binding this import introduces.
    pub fn local_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(default) = &self.default {
            names.push(default.as_str());
        }
        if let Some(namespace) = &self.namespace {
            names.push(namespace.as_str());
        }
        names.extend(self.named.iter().map(ImportedName::local));
        names
    }

    /// Package name for a bare specifier (`@scope/pkg/sub` -> `@scope/pkg`).
    pub fn package_name(&self) -> Option<String> {
        if self.is_relative() || self.specifier.starts_with('/') {
            return None;
        }
        let mut parts = self.specifier.split('/');
        let first = parts.next()?;
        if first.starts_with('@') {
            parts.next().map(|second| format!("{}/{}", first, second))
        } else {
            Some(first.to_string())
        }
    }

    pub fn render(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(default) = &self.default {
            clauses.push(default.clone());
        }
        if let Some(namespace) = &self.namespace {
            clauses.push(format!("* as {}", namespace));
        }
        if !self.named.is_empty() {
            let names: Vec<String> = self
                .named
                .iter()
                .map(|n| match &n.alias {
                    Some(alias) => format!("{} as {}", n.name, alias),
                    None => n.name.clone(),
                })
                .collect();
            clauses.push(format!("{{ {} }}", names.join(", ")));
        }
        let type_prefix = if self.type_only { "type " } else { "" };
        if clauses.is_empty() {
            format!("import '{}';", self.specifier)
        } else {
            format!(
                "import {}{} from '{}';",
                type_prefix,
                clauses.join(", "),
                self.specifier
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberKind {
    Property,
    Method,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub type_text: Option<String>,
    /// Declared with an accessibility or `readonly` modifier (a parameter property).
    pub is_property: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    /// Property type, or method return type.
    pub type_text: Option<String>,
    pub params: Vec<Param>,
    pub optional: bool,
    pub is_abstract: bool,
    pub is_static: bool,
    pub decorators: Vec<String>,
}

impl Member {
    pub fn has_decorator(&self, marker: &str) -> bool {
        self.decorators.iter().any(|d| d == marker)
    }
}

/// A top-level type declaration and its full source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: Option<String>,
    pub kind: TypeKind,
    pub path: PathBuf,
    pub text: String,
    pub exported: bool,
    /// Names after `extends` / `implements`, type arguments stripped.
    pub heritage: Vec<String>,
    pub members: Vec<Member>,
}

impl TypeDecl {
    /// Generation-target kind, when this declaration can be implemented.
    pub fn declaration_kind(&self) -> Option<DeclarationKind> {
        match self.kind {
            TypeKind::Interface => Some(DeclarationKind::Interface),
            TypeKind::AbstractClass => Some(DeclarationKind::AbstractBase),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Parse every import statement in a module.
pub fn parse_imports(text: &str) -> Vec<ImportDecl> {
    let cleaned = strip_comments(text);
    let mut found: Vec<(usize, ImportDecl)> = SIDE_EFFECT_IMPORT_RE
        .captures_iter(&cleaned)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            Some((
                start,
                ImportDecl {
                    specifier: caps[1].to_string(),
                    default: None,
                    named: Vec::new(),
                    namespace: None,
                    type_only: false,
                },
            ))
        })
        .collect();
    found.extend(IMPORT_RE.captures_iter(&cleaned).filter_map(|caps| {
        let start = caps.get(0)?.start();
        Some((start, import_from_captures(&caps)))
    }));
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, decl)| decl).collect()
}

fn import_from_captures(caps: &regex::Captures<'_>) -> ImportDecl {
    let clause = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let mut decl = ImportDecl {
        specifier: caps[3].to_string(),
        default: None,
        named: Vec::new(),
        namespace: None,
        type_only: caps.get(1).is_some(),
    };
    parse_import_clause(clause, &mut decl);
    decl
}

fn parse_import_clause(clause: &str, decl: &mut ImportDecl) {
    let mut rest = clause.trim();
    if let Some(open) = rest.find('{') {
        let close = rest[open..].find('}').map(|i| open + i).unwrap_or(rest.len());
        for part in rest[open + 1..close].split(',') {
            let part = part.trim().trim_start_matches("type ").trim();
            if part.is_empty() {
                continue;
            }
            let mut pieces = part.split_whitespace();
            let name = pieces.next().unwrap_or_default().to_string();
            let alias = match (pieces.next(), pieces.next()) {
                (Some("as"), Some(alias)) => Some(alias.to_string()),
                _ => None,
            };
            decl.named.push(ImportedName { name, alias });
        }
        let before = rest[..open].trim().trim_end_matches(',').trim();
        rest = before;
    }
    for part in rest.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some(ns) = part.strip_prefix('*') {
            let ns = ns.trim().trim_start_matches("as").trim();
            if !ns.is_empty() {
                decl.namespace = Some(ns.to_string());
            }
        } else {
            decl.default = Some(part.to_string());
        }
    }
}

/// Scan a module for top-level type declarations.
pub fn parse_declarations(path: &Path, text: &str) -> Vec<TypeDecl> {
    let cleaned = strip_comments(text);
    let mut declarations = Vec::new();
    let mut consumed_until = 0usize;

    for caps in DECL_RE.captures_iter(&cleaned) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        if whole.start() < consumed_until {
            continue;
        }
        let exported = caps.get(1).is_some();
        let is_default = caps.get(2).is_some();
        let is_abstract = caps.get(3).is_some();
        let keyword = &caps[4];
        let name = caps
            .get(5)
            .map(|m| m.as_str())
            .filter(|n| !matches!(*n, "extends" | "implements"))
            .map(str::to_string);
        let header_end = match (caps.get(5), &name) {
            (Some(m), None) => m.start(),
            _ => whole.end(),
        };

        if name.is_none() && !(is_default && keyword == "class") {
            continue;
        }
        // `class` / `type` used as identifiers (e.g. `type: string`) are not declarations
        let after = cleaned[header_end..].trim_start();
        if keyword == "type" && !after.starts_with('=') && !after.starts_with('<') {
            continue;
        }

        let kind = match (keyword, is_abstract) {
            ("interface", _) => TypeKind::Interface,
            ("class", true) => TypeKind::AbstractClass,
            ("class", false) => TypeKind::Class,
            ("enum", _) => TypeKind::Enum,
            _ => TypeKind::TypeAlias,
        };

        let start = line_start(&cleaned, whole.start());
        let (end, heritage, members) = if kind == TypeKind::TypeAlias {
            (statement_end(&cleaned, header_end), Vec::new(), Vec::new())
        } else {
            let open = match find_body_open(&cleaned, header_end) {
                Some(open) => open,
                None => continue,
            };
            let close = match matching_close(&cleaned, open) {
                Some(close) => close,
                None => continue,
            };
            let heritage = parse_heritage(&cleaned[header_end..open]);
            let members = if kind == TypeKind::Enum {
                Vec::new()
            } else {
                parse_members(&cleaned[open + 1..close])
            };
            (close + 1, heritage, members)
        };

        consumed_until = end;
        declarations.push(TypeDecl {
            name,
            kind,
            path: path.to_path_buf(),
            text: text[start..end].trim_end().to_string(),
            exported,
            heritage,
            members,
        });
    }

    declarations
}

fn line_start(text: &str, idx: usize) -> usize {
    text[..idx].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

fn find_body_open(text: &str, from: usize) -> Option<usize> {
    let mut angle = 0i32;
    for (offset, ch) in text[from..].char_indices() {
        match ch {
            '<' => angle += 1,
            '>' => angle -= 1,
            '{' if angle <= 0 => return Some(from + offset),
            ';' if angle <= 0 => return None,
            _ => {}
        }
    }
    None
}

fn parse_heritage(header: &str) -> Vec<String> {
    let mut names = Vec::new();
    let without_generics = strip_type_arguments(header);
    let mut tokens = without_generics
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());
    let mut collecting = false;
    for token in tokens.by_ref() {
        match token {
            "extends" | "implements" => collecting = true,
            _ if collecting => names.push(token.to_string()),
            _ => {}
        }
    }
    names
}

/// Remove `<...>` type argument lists, keeping the surrounding text.
pub fn strip_type_arguments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Offset just past the end of a statement starting at `from` (`;` or newline at depth zero).
fn statement_end(text: &str, from: usize) -> usize {
    let mut depth = 0i32;
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'>' if i > 0 && bytes[i - 1] != b'=' => depth -= 1,
            b';' if depth <= 0 => return i + 1,
            b'\n' if depth <= 0 => {
                let next = text[i + 1..].trim_start();
                if !(next.starts_with('|') || next.starts_with('&')) {
                    let current = text[from..i].trim_end();
                    if !(current.ends_with('=') || current.ends_with('|') || current.ends_with('&'))
                    {
                        return i;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Index of the brace closing the one at `open`, skipping strings and comments.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0i32;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            b'\n' if quote != b'`' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Replace comments with spaces, preserving offsets and line breaks.
pub fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = text[i + 2..]
                    .find("*/")
                    .map(|e| i + 2 + e + 2)
                    .unwrap_or(bytes.len());
                for b in out.iter_mut().take(end).skip(i) {
                    if *b != b'\n' {
                        *b = b' ';
                    }
                }
                i = end;
            }
            _ => i += 1,
        }
    }
    // Comment spans start and end on ASCII delimiters, so every multi-byte
    // character is blanked whole and the bytes stay valid UTF-8.
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

/// Split a declaration body into member signatures.
pub fn parse_members(body: &str) -> Vec<Member> {
    let mut members = Vec::new();
    let mut pending_decorators = Vec::new();
    for segment in split_members(body) {
        let mut rest = segment.trim();
        while let Some(caps) = DECORATOR_RE.captures(rest) {
            pending_decorators.push(caps[1].to_string());
            let consumed = caps.get(0).map(|m| m.end()).unwrap_or(0);
            rest = rest[consumed..].trim_start();
        }
        if rest.is_empty() {
            continue;
        }
        if let Some(mut member) = parse_member(rest) {
            member.decorators = std::mem::take(&mut pending_decorators);
            members.push(member);
        } else {
            pending_decorators.clear();
        }
    }
    members
}

fn split_members(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut segments = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' | b'[' | b'<' => depth += 1,
            b')' | b']' => depth -= 1,
            b'>' if i > 0 && bytes[i - 1] != b'=' => depth -= 1,
            b'{' => {
                let head = body[start..i].trim();
                // a method body closes the member
                if depth == 0 && (head.ends_with(')') || is_return_annotated(head)) {
                    if let Some(close) = matching_close(body, i) {
                        segments.push(body[start..i].to_string());
                        i = close + 1;
                        start = i;
                        continue;
                    }
                }
                depth += 1;
            }
            b'}' => depth -= 1,
            b';' | b',' if depth == 0 => {
                segments.push(body[start..i].to_string());
                start = i + 1;
            }
            b'\n' if depth == 0 => {
                let current = body[start..i].trim();
                let next = body[i + 1..].trim_start();
                let continues = current.is_empty()
                    || current.ends_with(':')
                    || current.ends_with('|')
                    || current.ends_with('&')
                    || current.ends_with('=')
                    || current.ends_with("=>")
                    || next.starts_with('|')
                    || next.starts_with('&')
                    || next.starts_with("=>");
                if !continues {
                    segments.push(body[start..i].to_string());
                    start = i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    if start < body.len() {
        segments.push(body[start..].to_string());
    }
    segments
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// `foo(): Promise<void>` followed by a body.
fn is_return_annotated(head: &str) -> bool {
    match head.rfind(')') {
        Some(idx) => {
            let tail = head[idx + 1..].trim_start();
            tail.starts_with(':') && METHOD_RE.is_match(strip_modifiers(head).0)
        }
        None => false,
    }
}

fn strip_modifiers(text: &str) -> (&str, bool, bool) {
    let mut rest = text.trim_start();
    let mut is_abstract = false;
    let mut is_static = false;
    loop {
        let word_end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len());
        let word = &rest[..word_end];
        let after = rest[word_end..].trim_start();
        let is_modifier = MODIFIERS.contains(&word)
            && !after.is_empty()
            && !after.starts_with('(')
            && !after.starts_with(':')
            && !after.starts_with('?')
            && !after.starts_with('=')
            && !after.starts_with('<');
        if !is_modifier {
            return (rest, is_abstract, is_static);
        }
        is_abstract |= word == "abstract";
        is_static |= word == "static";
        rest = after;
    }
}

fn parse_member(segment: &str) -> Option<Member> {
    let (rest, is_abstract, is_static) = strip_modifiers(segment);
    if rest.starts_with('[') {
        // index signature
        return None;
    }
    if rest.starts_with("constructor") && rest["constructor".len()..].trim_start().starts_with('(')
    {
        let open = rest.find('(')?;
        let close = matching_paren(rest, open)?;
        return Some(Member {
            name: "constructor".to_string(),
            kind: MemberKind::Constructor,
            type_text: None,
            params: parse_params(&rest[open + 1..close]),
            optional: false,
            is_abstract,
            is_static,
            decorators: Vec::new(),
        });
    }
    if let Some(caps) = METHOD_RE.captures(rest) {
        let name = caps[1].to_string();
        let open = caps.get(0).map(|m| m.end() - 1)?;
        let close = matching_paren(rest, open)?;
        let tail = rest[close + 1..].trim();
        let type_text = tail
            .strip_prefix(':')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        return Some(Member {
            name,
            kind: MemberKind::Method,
            type_text,
            params: parse_params(&rest[open + 1..close]),
            optional: caps.get(2).is_some(),
            is_abstract,
            is_static,
            decorators: Vec::new(),
        });
    }
    let caps = PROPERTY_RE.captures(rest)?;
    let name = caps[1].to_string();
    let optional = caps.get(2).map(|m| m.as_str() == "?").unwrap_or(false);
    let type_text = if &caps[3] == ":" {
        let after = &rest[caps.get(0).map(|m| m.end())?..];
        let ty = split_top_level(after, '=')
            .into_iter()
            .next()
            .unwrap_or_default();
        Some(ty.trim().to_string()).filter(|t| !t.is_empty())
    } else {
        None
    };
    Some(Member {
        name,
        kind: MemberKind::Property,
        type_text,
        params: Vec::new(),
        optional,
        is_abstract,
        is_static,
        decorators: Vec::new(),
    })
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `sep` where it is not nested inside brackets, braces, parens or type arguments.
pub fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for (i, &ch) in chars.iter().enumerate() {
        let prev = if i > 0 { chars[i - 1] } else { '\0' };
        let next = chars.get(i + 1).copied().unwrap_or('\0');
        match ch {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '>' if prev != '=' => depth -= 1,
            _ => {}
        }
        // `=>` belongs to a function type
        if ch == sep && depth == 0 && !(ch == '=' && next == '>') {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    parts.push(current);
    parts
}

fn parse_params(text: &str) -> Vec<Param> {
    split_top_level(text, ',')
        .into_iter()
        .filter_map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            let mut rest = raw;
            while let Some(caps) = DECORATOR_RE.captures(rest) {
                let consumed = caps.get(0).map(|m| m.end()).unwrap_or(0);
                rest = rest[consumed..].trim_start();
            }
            let mut is_property = false;
            loop {
                let word_end = rest
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(rest.len());
                let word = &rest[..word_end];
                let after = rest[word_end..].trim_start();
                if matches!(word, "public" | "private" | "protected" | "readonly" | "override")
                    && !after.starts_with(':')
                    && !after.is_empty()
                {
                    is_property = true;
                    rest = after;
                } else {
                    break;
                }
            }
            let without_default = split_top_level(rest, '=')
                .into_iter()
                .next()
                .unwrap_or_default();
            let (name, type_text) = match without_default.find(':') {
                Some(idx) => (
                    without_default[..idx].trim(),
                    Some(without_default[idx + 1..].trim().to_string()),
                ),
                None => (without_default.trim(), None),
            };
            Some(Param {
                name: name
                    .trim_start_matches("...")
                    .trim_end_matches('?')
                    .to_string(),
                type_text: type_text.filter(|t| !t.is_empty()),
                is_property,
            })
        })
        .collect()
}

/// Whether `ident` occurs in `text` as a whole identifier.
pub fn contains_identifier(text: &str, ident: &str) -> bool {
    if ident.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    let mut search_from = 0;
    while let Some(pos) = text[search_from..].find(ident) {
        let start = search_from + pos;
        let end = start + ident.len();
        let before_ok = text[..start].chars().next_back().map_or(true, |c| !is_ident(c));
        let after_ok = text[end..].chars().next().map_or(true, |c| !is_ident(c));
        if before_ok && after_ok {
            return true;
        }
        search_from = end;
    }
    false
}
