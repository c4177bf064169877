//! Model Provider Gateway
//!
//! One `generate(prompt, options) -> text` contract over pluggable backends.
//! Configuration resolves explicit call-site options first, then the named
//! provider's stored settings, then the provider type's built-in default, then
//! the global default model. Every network call runs under a request-scoped
//! timeout that surfaces as [`ProviderError::Timeout`].

use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

pub mod gateway;
pub mod http;
pub mod registry;

pub use gateway::GatewayProvider;
pub use http::HttpJsonProvider;
pub use registry::ProviderRegistry;

/// Name resolved when no provider is specified.
pub const DEFAULT_PROVIDER: &str = "default";

/// Endpoint of the seeded `default` provider.
pub const DEFAULT_HTTP_ENDPOINT: &str = "http://localhost:11434";

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Plain HTTP JSON endpoint (`POST /api/generate`).
    Http,
    /// Chat-completions gateway with auth headers and streaming bodies.
    Gateway,
}

impl ProviderType {
    /// Built-in default model, if the backend type has one.
    pub fn default_model(self) -> Option<&'static str> {
        match self {
            ProviderType::Http => Some("llama3"),
            ProviderType::Gateway => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::Http => "http",
            ProviderType::Gateway => "gateway",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Stored configuration for one named provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub settings: ProviderSettings,
}

impl ProviderConfig {
    pub fn http(endpoint: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Http,
            default_model: None,
            settings: ProviderSettings {
                endpoint: Some(endpoint.into()),
                ..ProviderSettings::default()
            },
        }
    }

    pub fn gateway(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Gateway,
            default_model: None,
            settings: ProviderSettings {
                endpoint: Some(endpoint.into()),
                api_key: Some(api_key.into()),
                ..ProviderSettings::default()
            },
        }
    }

    /// Static checks, no network access.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(endpoint) = &self.settings.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("Invalid endpoint URL: {}", endpoint));
            }
        }
        if self.provider_type == ProviderType::Gateway {
            if self.settings.endpoint.is_none() {
                return Err("Gateway providers require an endpoint".to_string());
            }
            if self.settings.api_key.as_deref().map_or(true, str::is_empty) {
                return Err("Gateway providers require an api_key".to_string());
            }
        }
        if let Some(t) = self.settings.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("Temperature must be between 0.0 and 2.0, got {}", t));
            }
        }
        if self.settings.timeout_secs == Some(0) {
            return Err("timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Explicit call-site options. Unset fields fall through to configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
}

/// Run-wide fallbacks below the provider's own settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDefaults {
    pub model: Option<String>,
    pub timeout: Duration,
}

impl Default for GlobalDefaults {
    fn default() -> Self {
        Self {
            model: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Fully resolved parameters for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl ResolvedRequest {
    /// explicit > stored settings > provider-type default > global default
    pub fn resolve(
        options: &GenerateOptions,
        config: &ProviderConfig,
        defaults: &GlobalDefaults,
    ) -> Result<Self, ProviderError> {
        let model = options
            .model
            .clone()
            .or_else(|| config.default_model.clone())
            .or_else(|| config.provider_type.default_model().map(str::to_string))
            .or_else(|| defaults.model.clone())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                ProviderError::Config(format!(
                    "No model configured for {} provider",
                    config.provider_type.as_str()
                ))
            })?;
        let timeout = options
            .timeout
            .or_else(|| config.settings.timeout_secs.map(Duration::from_secs))
            .unwrap_or(defaults.timeout);
        Ok(Self {
            model,
            temperature: options.temperature.or(config.settings.temperature),
            max_tokens: options.max_tokens.or(config.settings.max_tokens),
            timeout,
        })
    }
}

/// A text-generation backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerateOptions)
        -> Result<String, ProviderError>;

    /// Cheap reachability and credential check.
    async fn validate_connection(&self) -> Result<(), ProviderError>;

    /// Models offered by the backend; `None` when listing is unsupported.
    async fn list_models(&self) -> Result<Option<Vec<String>>, ProviderError> {
        Ok(None)
    }

    fn provider_name(&self) -> &str;
}

pub(crate) fn build_provider_http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Abort `call` after `limit`, reporting a timeout rather than a transport failure.
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}

/// Map a non-2xx response to a transport error carrying a bounded body excerpt.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        let excerpt: String = body.chars().take(500).collect();
        Err(ProviderError::transport(Some(status.as_u16()), excerpt))
    }
}

pub(crate) fn trim_endpoint(endpoint: &str) -> String {
    endpoint.trim_end_matches('/').to_string()
}

// Scripted provider for tests
#[cfg(test)]
pub struct MockProvider {
    responses: parking_lot::Mutex<std::collections::VecDeque<Result<String, ProviderError>>>,
    prompts: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: parking_lot::Mutex::new(responses.into()),
            prompts: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: &str) -> Self {
        Self::new((0..16).map(|_| Ok(response.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProvider for MockProvider {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        self.prompts.lock().push(prompt.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::InvalidResponse("script exhausted".to_string())))
    }

    async fn validate_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
