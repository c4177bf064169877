//! CLI presentation: text and json formatters per command family.

mod generate;
mod provider;
mod shared;

pub use generate::{format_generate_json, format_generate_text};
pub use provider::{
    format_provider_list_json, format_provider_list_text, format_provider_test_result,
    ProviderTestReport,
};
pub use shared::{format_docs_clear, format_docs_index, format_lock_change, format_lock_list};
