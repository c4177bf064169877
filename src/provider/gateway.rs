//! Chat-completions gateway provider.
//!
//! Requires an explicit endpoint and API key. Responses may be a single JSON
//! payload in one of several common shapes, or a server-sent-event body whose
//! fragments are concatenated.

use super::{
    build_provider_http_client, check_status, trim_endpoint, with_timeout, GenerateOptions,
    GlobalDefaults, ModelProvider, ProviderConfig, ResolvedRequest,
};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

pub struct GatewayProvider {
    client: Client,
    name: String,
    endpoint: String,
    api_key: String,
    headers: HeaderMap,
    config: ProviderConfig,
    defaults: GlobalDefaults,
}

impl GatewayProvider {
    /// Fails before any network call when the endpoint, key or headers are unusable.
    pub fn new(
        name: impl Into<String>,
        config: ProviderConfig,
        defaults: GlobalDefaults,
    ) -> Result<Self, ProviderError> {
        let name = name.into();
        let endpoint = config
            .settings
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(trim_endpoint)
            .ok_or_else(|| {
                ProviderError::Config(format!("Provider '{}' requires an endpoint", name))
            })?;
        let api_key = config
            .settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ProviderError::Config(format!("Provider '{}' requires an api_key", name))
            })?;

        let mut headers = HeaderMap::new();
        for (key, value) in &config.settings.headers {
            let header = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                ProviderError::Config(format!("Invalid header name '{}': {}", key, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ProviderError::Config(format!("Invalid value for header '{}': {}", key, e))
            })?;
            headers.insert(header, value);
        }

        Ok(Self {
            client: build_provider_http_client()?,
            name,
            endpoint,
            api_key,
            headers,
            config,
            defaults,
        })
    }

    async fn models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.endpoint);
        with_timeout(self.defaults.timeout, async {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .headers(self.headers.clone())
                .send()
                .await?;
            let body = check_status(response).await?;
            let value: Value = serde_json::from_str(&body).map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse model list: {}", e))
            })?;
            let models = value
                .get("data")
                .or_else(|| value.get("models"))
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|m| {
                            m.get("id")
                                .or_else(|| m.get("name"))
                                .and_then(Value::as_str)
                                .map(str::to_string)
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok(models)
        })
        .await
    }
}

#[async_trait]
impl ModelProvider for GatewayProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let resolved = ResolvedRequest::resolve(options, &self.config, &self.defaults)?;
        let url = format!("{}/chat/completions", self.endpoint);
        let request = ChatRequest {
            model: &resolved.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: resolved.temperature,
            max_tokens: resolved.max_tokens,
        };
        debug!(provider = %self.name, model = %resolved.model, "Sending chat completion request");

        with_timeout(resolved.timeout, async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .headers(self.headers.clone())
                .json(&request)
                .send()
                .await?;
            let body = check_status(response).await?;
            extract_content(&body)
        })
        .await
    }

    async fn validate_connection(&self) -> Result<(), ProviderError> {
        self.models().await.map(|_| ())
    }

    async fn list_models(&self) -> Result<Option<Vec<String>>, ProviderError> {
        self.models().await.map(Some)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

/// Pull generated text out of a JSON or SSE response body.
pub fn extract_content(body: &str) -> Result<String, ProviderError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with("data:") || trimmed.starts_with("event:") {
        return extract_streamed(body);
    }
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
    content_of(&value).ok_or_else(|| {
        ProviderError::InvalidResponse("Response contains no generated content".to_string())
    })
}

fn content_of(value: &Value) -> Option<String> {
    let as_text = |v: &Value| -> Option<String> {
        match v {
            Value::String(s) => Some(s.clone()),
            // content blocks: [{ "type": "text", "text": "..." }]
            Value::Array(blocks) => {
                let text: String = blocks
                    .iter()
                    .filter_map(|b| b.get("text").and_then(Value::as_str))
                    .collect();
                (!text.is_empty()).then_some(text)
            }
            _ => None,
        }
    };
    value
        .pointer("/choices/0/message/content")
        .and_then(as_text)
        .or_else(|| value.pointer("/choices/0/text").and_then(as_text))
        .or_else(|| value.get("content").and_then(as_text))
        .or_else(|| value.get("output").and_then(as_text))
        .or_else(|| value.get("response").and_then(as_text))
}

fn extract_streamed(body: &str) -> Result<String, ProviderError> {
    let mut out = String::new();
    let mut saw_event = false;
    for line in body.lines() {
        let data = match line.trim().strip_prefix("data:") {
            Some(data) => data.trim(),
            None => continue,
        };
        if data == "[DONE]" {
            break;
        }
        if data.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(data).map_err(|e| {
            ProviderError::InvalidResponse(format!("Malformed stream event: {}", e))
        })?;
        saw_event = true;
        let fragment = value
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| content_of(&value));
        if let Some(fragment) = fragment {
            out.push_str(&fragment);
        }
    }
    if !saw_event {
        return Err(ProviderError::InvalidResponse(
            "Stream contained no events".to_string(),
        ));
    }
    Ok(out)
}
