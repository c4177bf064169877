//! Plain HTTP JSON provider (Ollama-style `/api/generate`).

use super::{
    build_provider_http_client, check_status, trim_endpoint, with_timeout, GenerateOptions,
    GlobalDefaults, ModelProvider, ProviderConfig, ResolvedRequest, DEFAULT_HTTP_ENDPOINT,
};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Serialize)]
struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

pub struct HttpJsonProvider {
    client: Client,
    name: String,
    endpoint: String,
    config: ProviderConfig,
    defaults: GlobalDefaults,
}

impl HttpJsonProvider {
    pub fn new(
        name: impl Into<String>,
        config: ProviderConfig,
        defaults: GlobalDefaults,
    ) -> Result<Self, ProviderError> {
        let endpoint = trim_endpoint(
            config
                .settings
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_HTTP_ENDPOINT),
        );
        Ok(Self {
            client: build_provider_http_client()?,
            name: name.into(),
            endpoint,
            config,
            defaults,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn tags(&self) -> Result<TagsResponse, ProviderError> {
        let url = format!("{}/api/tags", self.endpoint);
        with_timeout(self.defaults.timeout, async {
            let response = self.client.get(&url).send().await?;
            let body = check_status(response).await?;
            serde_json::from_str(&body).map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse model list: {}", e))
            })
        })
        .await
    }
}

#[async_trait]
impl ModelProvider for HttpJsonProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let resolved = ResolvedRequest::resolve(options, &self.config, &self.defaults)?;
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &resolved.model,
            prompt,
            stream: false,
            options: SamplingOptions {
                temperature: resolved.temperature,
                num_predict: resolved.max_tokens,
            },
        };
        debug!(provider = %self.name, model = %resolved.model, "Sending generate request");

        with_timeout(resolved.timeout, async {
            let response = self.client.post(&url).json(&request).send().await?;
            let body = check_status(response).await?;
            let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
            })?;
            Ok(parsed.response)
        })
        .await
    }

    async fn validate_connection(&self) -> Result<(), ProviderError> {
        self.tags().await.map(|_| ())
    }

    async fn list_models(&self) -> Result<Option<Vec<String>>, ProviderError> {
        let tags = self.tags().await?;
        Ok(Some(tags.models.into_iter().map(|m| m.name).collect()))
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
