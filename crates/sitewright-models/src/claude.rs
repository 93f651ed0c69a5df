//! Claude (Anthropic) completion client.
//!
//! Claude takes the system prompt through a dedicated `system` field rather than
//! as a message in the conversation, so the request carries exactly one user
//! message and the system prompt alongside it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sitewright_abstraction::{CompletionClient, CompletionError};
use std::env;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::http;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Claude completion client.
#[derive(Debug, Clone)]
pub struct ClaudeClient {
    /// The model ID (e.g., "claude-sonnet-4-5-20250929").
    model_id: String,
    /// Provider-qualified identifier used in logs.
    client_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the Claude API.
    base_url: String,
    /// Maximum tokens to request per completion.
    max_tokens: u32,
    /// Request timeout applied by the HTTP client.
    timeout: Duration,
    /// HTTP client for making requests.
    client: Client,
}

impl ClaudeClient {
    /// Creates a new `ClaudeClient` using `ANTHROPIC_API_KEY` from the environment.
    ///
    /// # Errors
    /// Returns `CompletionError::NotConfigured` if the API key is not set.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn new(model_id: String, timeout: Duration) -> Result<Self, CompletionError> {
        let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
            CompletionError::NotConfigured("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Self::with_api_key(model_id, api_key, timeout)
    }

    /// Creates a new `ClaudeClient` with an explicit API key.
    ///
    /// # Errors
    /// Returns `CompletionError::NotConfigured` if the HTTP client cannot be built.
    pub fn with_api_key(
        model_id: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::NotConfigured(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client_id: format!("anthropic/{model_id}"),
            model_id,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout,
            client,
        })
    }

    /// Points the client at a different API root (proxies, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the per-completion token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl CompletionClient for ClaudeClient {
    async fn complete(
        &self,
        cancel: &CancellationToken,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        debug!(
            model_id = %self.model_id,
            system_len = system_prompt.len(),
            prompt_len = user_prompt.len(),
            "ClaudeClient completing"
        );

        let url = format!("{}/messages", self.base_url);
        let request_body = ClaudeRequest {
            model: &self.model_id,
            max_tokens: self.max_tokens,
            system: (!system_prompt.is_empty()).then_some(system_prompt),
            messages: vec![ClaudeMessage { role: "user", content: user_prompt }],
        };

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body);

        let response = http::send(request, cancel, "anthropic", self.timeout.as_secs()).await?;

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Claude API response");
            CompletionError::Serialization(format!("failed to parse response: {e}"))
        })?;

        let content: String = claude_response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect();

        if content.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(content)
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }
}

// Claude API request/response structures

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}
