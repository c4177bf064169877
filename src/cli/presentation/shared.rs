//! Lock and documentation cache presentation.

use crate::docs::IndexReport;
use std::path::PathBuf;

pub fn format_lock_list<'a>(paths: impl Iterator<Item = &'a PathBuf>) -> String {
    let lines: Vec<String> = paths.map(|p| format!("  {}", p.display())).collect();
    if lines.is_empty() {
        return "No locked files.".to_string();
    }
    format!("Locked files:\n{}\n\nTotal: {}", lines.join("\n"), lines.len())
}

/// `verb` is "Locked" or "Unlocked".
pub fn format_lock_change(verb: &str, changed: &[PathBuf], requested: usize) -> String {
    let mut out = format!("{} {} of {} path(s)", verb, changed.len(), requested);
    for path in changed {
        out.push_str(&format!("\n  {}", path.display()));
    }
    out
}

pub fn format_docs_index(report: &IndexReport) -> String {
    let mut out = format!("Indexed {} package(s)", report.indexed);
    if !report.missing.is_empty() {
        out.push_str(&format!(
            "\nNo type declarations found for {} package(s): {}",
            report.missing.len(),
            report.missing.join(", ")
        ));
    }
    out
}

pub fn format_docs_clear(removed: usize) -> String {
    format!("Removed {} cached entr{}", removed, if removed == 1 { "y" } else { "ies" })
}
