//! Client factory for creating completion clients from configuration.
//!
//! API keys come from the configuration when present, otherwise from the
//! provider's environment variable.

use crate::{ClaudeClient, MockClient, OpenAIClient, RetryPolicy, RetryingClient};
use sitewright_abstraction::{CompletionClient, CompletionError};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Provider enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Echoing mock for offline runs.
    Mock,
    /// Anthropic Claude.
    Claude,
    /// OpenAI or an OpenAI-compatible server.
    OpenAI,
}

impl FromStr for ProviderKind {
    type Err = CompletionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "claude" | "anthropic" => Ok(Self::Claude),
            "openai" | "openai-compatible" => Ok(Self::OpenAI),
            other => Err(CompletionError::NotConfigured(format!("unrecognized provider: {other}"))),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Which provider to talk to.
    pub provider: ProviderKind,
    /// The model ID (e.g., "claude-sonnet-4-5-20250929", "gpt-4o").
    pub model_id: String,
    /// Optional API key (if not provided, will be loaded from environment).
    pub api_key: Option<String>,
    /// Optional API root override.
    pub base_url: Option<String>,
    /// HTTP timeout for a single request.
    pub request_timeout: Duration,
    /// Client-level retry of transient failures.
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Creates a configuration with default timeout and retry policy.
    #[must_use]
    pub fn new(provider: ProviderKind, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            api_key: None,
            base_url: None,
            request_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the API key for this configuration.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL for this configuration.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Factory for creating completion clients.
pub struct ClientFactory;

impl ClientFactory {
    /// Creates a retrying client from the given configuration.
    ///
    /// # Errors
    /// Returns `CompletionError::NotConfigured` if the provider cannot be set up
    /// (e.g., missing API key).
    pub fn create(config: &ClientConfig) -> Result<Arc<dyn CompletionClient>, CompletionError> {
        debug!(
            provider = ?config.provider,
            model_id = %config.model_id,
            "Creating completion client"
        );

        let retry = config.retry.clone();
        match config.provider {
            ProviderKind::Mock => {
                let mock = MockClient::with_responder(|_, user, _| Ok(format!("Mock response for: {user}")));
                Ok(Arc::new(RetryingClient::new(mock, retry)))
            }
            ProviderKind::Claude => {
                let mut client = match &config.api_key {
                    Some(key) => ClaudeClient::with_api_key(
                        config.model_id.clone(),
                        key.clone(),
                        config.request_timeout,
                    ),
                    None => ClaudeClient::new(config.model_id.clone(), config.request_timeout),
                }
                .inspect_err(|e| error!(error = %e, "Failed to create Claude client"))?;
                if let Some(base_url) = &config.base_url {
                    client = client.with_base_url(base_url.clone());
                }
                Ok(Arc::new(RetryingClient::new(client, retry)))
            }
            ProviderKind::OpenAI => {
                let mut client = match &config.api_key {
                    Some(key) => OpenAIClient::with_api_key(
                        config.model_id.clone(),
                        key.clone(),
                        config.request_timeout,
                    ),
                    None => OpenAIClient::new(config.model_id.clone(), config.request_timeout),
                }
                .inspect_err(|e| error!(error = %e, "Failed to create OpenAI client"))?;
                if let Some(base_url) = &config.base_url {
                    client = client.with_base_url(base_url.clone());
                }
                Ok(Arc::new(RetryingClient::new(client, retry)))
            }
        }
    }
}
