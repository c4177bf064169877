//! Merge rules: built-in defaults every layer overrides.

use crate::provider::{ProviderType, DEFAULT_HTTP_ENDPOINT, DEFAULT_PROVIDER};
use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let default_provider = format!("providers.{}", DEFAULT_PROVIDER);
    Config::builder()
        .set_default(
            format!("{}.provider_type", default_provider),
            ProviderType::Http.as_str(),
        )?
        .set_default(
            format!("{}.settings.endpoint", default_provider),
            DEFAULT_HTTP_ENDPOINT,
        )?
        .set_default("generation.max_retries", crate::healing::DEFAULT_MAX_RETRIES as i64)?
        .set_default("generation.timeout_secs", 120_i64)?
        .set_default("generation.marker", "Inject")?
        .set_default("generation.out_dir", "src/generated")?
        .set_default("generation.registry_file", "container.ts")?
        .set_default("generation.checker", "conformance")?
        .set_default("generation.lock_manifest", ".weld/locks.json")?
        .set_default("logging.level", "info")?
        .set_default("logging.output", "stderr")
}
