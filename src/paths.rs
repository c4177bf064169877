//! Path canonicalization and module specifier utilities

use crate::error::WeldError;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize and normalize a path so equal files compare equal
///
/// This function:
/// 1. Canonicalizes the path when it exists (resolves symlinks, `..`, `.`)
/// 2. Falls back to lexical normalization against `base` for paths that do not exist yet
/// 3. Normalizes Unicode to NFC
/// 4. Removes trailing slashes (except root)
pub fn canonicalize_path(path: &Path, base: &Path) -> Result<PathBuf, WeldError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let resolved = if absolute.exists() {
        dunce::canonicalize(&absolute)
            .map_err(|e| WeldError::Lock(format!("Failed to canonicalize path: {}", e)))?
    } else {
        normalize_lexically(&absolute)
    };
    Ok(PathBuf::from(normalize_path_string(&resolved.to_string_lossy())))
}

/// Normalize a path string (NFC, no trailing separators) without filesystem access
pub fn normalize_path_string(path: &str) -> String {
    let mut result: String = path.nfc().collect();
    if result.len() > 1 {
        while result.ends_with('/') || result.ends_with('\\') {
            result.pop();
        }
    }
    result
}

/// Resolve `.` and `..` components without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Relative path from directory `from` to `to`, both absolute
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from_path = normalize_lexically(from);
    let to_path = normalize_lexically(to);
    let from: Vec<Component> = from_path.components().collect();
    let to: Vec<Component> = to_path.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component.as_os_str());
    }
    out
}

/// Module specifier importing `module` from a file in `from_dir` (`./x`, `../y/z`)
pub fn module_specifier(from_dir: &Path, module: &Path) -> String {
    let without_ext = strip_ts_extension(module);
    let relative = relative_path(from_dir, &without_ext);
    let mut spec = relative.to_string_lossy().replace('\\', "/");
    if !spec.starts_with("../") {
        spec = format!("./{}", spec);
    }
    spec
}

/// Re-express a relative specifier written in `original_dir` so it resolves from `new_dir`
pub fn rebase_specifier(specifier: &str, original_dir: &Path, new_dir: &Path) -> String {
    if !specifier.starts_with('.') {
        return specifier.to_string();
    }
    let target = normalize_lexically(&original_dir.join(specifier));
    let relative = relative_path(new_dir, &target);
    let mut spec = relative.to_string_lossy().replace('\\', "/");
    if spec.is_empty() {
        spec = ".".to_string();
    }
    if !spec.starts_with("../") && spec != ".." {
        spec = format!("./{}", spec);
    }
    spec
}

fn strip_ts_extension(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    for ext in [".d.ts", ".tsx", ".ts"] {
        if let Some(stripped) = text.strip_suffix(ext) {
            return PathBuf::from(stripped);
        }
    }
    path.to_path_buf()
}
