//! Error types for the weld generation pipeline.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised before a declaration can be resolved into a context bundle.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Anonymous declaration in {0} cannot be generated; give it a name")]
    Anonymous(PathBuf),

    #[error("Declaration not found: {0}")]
    NotFound(String),
}

/// Errors surfaced by model providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing endpoint, credentials or other required setting. Raised before any network call.
    #[error("Provider configuration error: {0}")]
    Config(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Network failure or non-2xx response.
    #[error("Provider request failed: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The request-scoped timeout elapsed and the in-flight call was aborted.
    #[error("Provider request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = match status {
            Some(code) => format!("status {}: {}", code, message),
            None => message,
        };
        ProviderError::Transport { status, message }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }

    /// Timeouts are a transport failure too; both are retryable inside the healing loop.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProviderError::Transport { .. } | ProviderError::Timeout(_)
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Short tag for logs and summaries.
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Config(_) => "provider_config",
            ProviderError::NotConfigured(_) => "provider_not_configured",
            ProviderError::Transport { .. } => "provider_transport",
            ProviderError::Timeout(_) => "provider_timeout",
            ProviderError::InvalidResponse(_) => "provider_invalid_response",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            // reqwest does not expose the configured duration on the error
            ProviderError::Timeout(Duration::ZERO)
        } else if let Some(status) = error.status() {
            ProviderError::transport(Some(status.as_u16()), error.to_string())
        } else if error.is_connect() {
            ProviderError::transport(None, format!("Connection error: {}", error))
        } else {
            ProviderError::transport(None, format!("HTTP error: {}", error))
        }
    }
}

/// Top-level error for weld operations.
#[derive(Debug, Error)]
pub enum WeldError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Lock manifest error: {0}")]
    Lock(String),

    #[error("Validation failed after {attempts} retry attempts")]
    RetryExhausted { attempts: u32 },

    #[error("Service not registered: {0}")]
    NotRegistered(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for WeldError {
    fn from(err: config::ConfigError) -> Self {
        WeldError::Config(err.to_string())
    }
}
