//! Generate command presentation: per-target table and totals.

use crate::error::WeldError;
use crate::orchestrator::{GenerationOutcome, OutcomeStatus, RunSummary};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::{Cell, Color, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::Path;

fn status_cell(status: OutcomeStatus) -> Cell {
    let color = match status {
        OutcomeStatus::Generated => Color::Green,
        OutcomeStatus::Skipped => Color::Grey,
        OutcomeStatus::Locked => Color::Yellow,
        OutcomeStatus::Error => Color::Red,
    };
    Cell::new(status.as_str()).fg(color)
}

fn sorted(summary: &RunSummary) -> Vec<&GenerationOutcome> {
    let mut outcomes: Vec<&GenerationOutcome> = summary.outcomes.iter().collect();
    outcomes.sort_by(|a, b| a.target_name.cmp(&b.target_name));
    outcomes
}

pub fn format_generate_text(summary: &RunSummary, registry: Option<&Path>) -> String {
    if summary.outcomes.is_empty() {
        return "No injected services found.".to_string();
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Target", "Status", "Attempts", "Time", "Error"]);
    for outcome in sorted(summary) {
        let attempts = if outcome.attempts > 0 {
            outcome.attempts.to_string()
        } else {
            "-".to_string()
        };
        table.add_row(vec![
            Cell::new(&outcome.target_name),
            status_cell(outcome.status),
            Cell::new(attempts),
            Cell::new(format!("{} ms", outcome.duration_ms)),
            Cell::new(outcome.error.as_deref().unwrap_or("")),
        ]);
    }

    let mut out = format!("{}\n", table);
    let totals = format!(
        "{} generated, {} skipped, {} locked, {} failed",
        summary.count(OutcomeStatus::Generated),
        summary.count(OutcomeStatus::Skipped),
        summary.count(OutcomeStatus::Locked),
        summary.count(OutcomeStatus::Error),
    );
    if summary.has_errors() {
        out.push_str(&format!("\n{}", totals.red()));
    } else {
        out.push_str(&format!("\n{}", totals.green()));
    }
    if let Some(path) = registry {
        out.push_str(&format!("\nRegistry: {}", path.display()));
    }
    out
}

pub fn format_generate_json(
    summary: &RunSummary,
    registry: Option<&Path>,
) -> Result<String, WeldError> {
    let outcomes: Vec<&GenerationOutcome> = sorted(summary);
    let out = json!({
        "outcomes": outcomes,
        "generated": summary.count(OutcomeStatus::Generated),
        "skipped": summary.count(OutcomeStatus::Skipped),
        "locked": summary.count(OutcomeStatus::Locked),
        "errors": summary.count(OutcomeStatus::Error),
        "registry": registry.map(|p| p.display().to_string()),
        "finished_at": chrono::Utc::now().to_rfc3339(),
    });
    Ok(serde_json::to_string_pretty(&out)?)
}
