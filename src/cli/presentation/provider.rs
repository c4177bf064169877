//! Provider command presentation: list and connectivity test.

use crate::error::WeldError;
use crate::provider::{ProviderConfig, ProviderRegistry};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

fn model_label(config: &ProviderConfig) -> String {
    config
        .default_model
        .clone()
        .or_else(|| config.provider_type.default_model().map(str::to_string))
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_provider_list_text(registry: &ProviderRegistry) -> String {
    let default_name = registry.resolve_name(None).to_string();
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Type", "Model", "Endpoint"]);
    let mut total = 0;
    for (name, config) in registry.list_all() {
        total += 1;
        let label = if *name == default_name {
            format!("{} (default)", name)
        } else {
            name.clone()
        };
        table.add_row(vec![
            label,
            config.provider_type.as_str().to_string(),
            model_label(config),
            config
                .settings
                .endpoint
                .clone()
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    if total == 0 {
        return "No providers configured.".to_string();
    }
    format!("{}\n\nTotal: {} provider(s)", table, total)
}

pub fn format_provider_list_json(registry: &ProviderRegistry) -> Result<String, WeldError> {
    let default_name = registry.resolve_name(None);
    let providers: Vec<_> = registry
        .list_all()
        .map(|(name, config)| {
            json!({
                "name": name,
                "provider_type": config.provider_type.as_str(),
                "model": config.default_model,
                "endpoint": config.settings.endpoint,
                "has_api_key": config.settings.api_key.is_some(),
                "default": name == default_name,
            })
        })
        .collect();
    let out = json!({ "providers": providers, "total": providers.len() });
    Ok(serde_json::to_string_pretty(&out)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTestReport {
    pub name: String,
    pub connected: bool,
    pub error: Option<String>,
    /// `None` when the provider cannot list models.
    pub models: Option<Vec<String>>,
}

pub fn format_provider_test_result(report: &ProviderTestReport) -> String {
    let mut out = if report.connected {
        format!("Provider '{}': {}", report.name, "reachable".green())
    } else {
        format!(
            "Provider '{}': {} ({})",
            report.name,
            "unreachable".red(),
            report.error.as_deref().unwrap_or("unknown error")
        )
    };
    match &report.models {
        Some(models) if models.is_empty() => out.push_str("\nNo models reported."),
        Some(models) => {
            out.push_str(&format!("\nModels ({}):", models.len()));
            for model in models {
                out.push_str(&format!("\n  {}", model));
            }
        }
        None => {}
    }
    out
}
