//! CLI output: error mapping from domain errors to stable CLI messages.

use crate::error::{ProviderError, WeldError};

/// Map domain errors to a single line for stderr, with a hint where one helps.
pub fn map_error(e: &WeldError) -> String {
    match e {
        WeldError::Provider(ProviderError::NotConfigured(name)) => format!(
            "{}\nHint: add [providers.{}] to weld.toml or pass --provider",
            e, name
        ),
        WeldError::Provider(p) if p.is_transport() => format!(
            "{}\nHint: check the provider endpoint with 'weld provider test'",
            e
        ),
        _ => e.to_string(),
    }
}
