//! OpenAI completion client.
//!
//! OpenAI takes the system prompt inline as the first message with role
//! `system`. Any OpenAI-compatible endpoint works through `with_base_url`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sitewright_abstraction::{CompletionClient, CompletionError};
use std::env;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::http;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI completion client.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    /// The model ID (e.g., "gpt-4o").
    model_id: String,
    client_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the OpenAI API.
    base_url: String,
    timeout: Duration,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAIClient {
    /// Creates a new `OpenAIClient` using `OPENAI_API_KEY` from the environment.
    ///
    /// # Errors
    /// Returns `CompletionError::NotConfigured` if the API key is not set.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn new(model_id: String, timeout: Duration) -> Result<Self, CompletionError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            CompletionError::NotConfigured("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Self::with_api_key(model_id, api_key, timeout)
    }

    /// Creates a new `OpenAIClient` with an explicit API key.
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
            client_id: format!("openai/{model_id}"),
            model_id,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
            client,
        })
    }

    /// Points the client at a different API root (OpenAI-compatible servers, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(
        &self,
        cancel: &CancellationToken,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = user_prompt.len(),
            "OpenAIClient completing"
        );

        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(OpenAIMessage { role: "system", content: system_prompt });
        }
        messages.push(OpenAIMessage { role: "user", content: user_prompt });

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&OpenAIRequest { model: &self.model_id, messages });

        let response = http::send(request, cancel, "openai", self.timeout.as_secs()).await?;

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse OpenAI API response");
            CompletionError::Serialization(format!("failed to parse response: {e}"))
        })?;

        let content = openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(content)
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_client_id() {
        let client =
            OpenAIClient::with_api_key("gpt-4o".to_string(), "k".to_string(), Duration::from_secs(10))
                .unwrap();
        assert_eq!(client.client_id(), "openai/gpt-4o");
    }

    #[test]
    fn test_response_without_content_deserializes() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: OpenAIResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
