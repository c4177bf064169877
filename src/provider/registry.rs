//! Named provider configurations and provider construction.

use super::{
    GatewayProvider, GlobalDefaults, HttpJsonProvider, ModelProvider, ProviderConfig,
    ProviderType, DEFAULT_PROVIDER,
};
use crate::config::WeldConfig;
use crate::error::ProviderError;
use std::collections::BTreeMap;
use std::time::Duration;

/// Provider configurations keyed by name, read-only for the duration of a run.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderConfig>,
    default_name: Option<String>,
    defaults: GlobalDefaults,
}

impl ProviderRegistry {
    pub fn new(defaults: GlobalDefaults) -> Self {
        Self {
            providers: BTreeMap::new(),
            default_name: None,
            defaults,
        }
    }

    pub fn from_config(config: &WeldConfig) -> Self {
        let mut registry = Self::new(GlobalDefaults {
            model: config.generation.model.clone(),
            timeout: Duration::from_secs(config.generation.timeout_secs),
        });
        registry.default_name = config.generation.provider.clone();
        for (name, provider) in &config.providers {
            registry.insert(name.clone(), provider.clone());
        }
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, config: ProviderConfig) {
        self.providers.insert(name.into(), config);
    }

    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    pub fn get_or_error(&self, name: &str) -> Result<&ProviderConfig, ProviderError> {
        self.get(name)
            .ok_or_else(|| ProviderError::NotConfigured(format!("Provider not found: {}", name)))
    }

    pub fn list_all(&self) -> impl Iterator<Item = (&String, &ProviderConfig)> {
        self.providers.iter()
    }

    pub fn defaults(&self) -> &GlobalDefaults {
        &self.defaults
    }

    /// The configured provider name, falling back to `default`.
    pub fn resolve_name<'a>(&'a self, name: Option<&'a str>) -> &'a str {
        name.or(self.default_name.as_deref())
            .unwrap_or(DEFAULT_PROVIDER)
    }

    pub fn create_provider(
        &self,
        name: Option<&str>,
    ) -> Result<(Box<dyn ModelProvider>, ProviderConfig), ProviderError> {
        let name = self.resolve_name(name);
        let config = self.get_or_error(name)?.clone();
        config
            .validate()
            .map_err(|e| ProviderError::Config(format!("Provider '{}': {}", name, e)))?;
        let provider: Box<dyn ModelProvider> = match config.provider_type {
            ProviderType::Http => Box::new(HttpJsonProvider::new(
                name,
                config.clone(),
                self.defaults.clone(),
            )?),
            ProviderType::Gateway => Box::new(GatewayProvider::new(
                name,
                config.clone(),
                self.defaults.clone(),
            )?),
        };
        Ok((provider, config))
    }
}
