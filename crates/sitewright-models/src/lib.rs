//! Completion client implementations for Sitewright.
//!
//! This crate provides concrete implementations of the `CompletionClient` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Scripted responses for testing and offline runs
//! - **Claude**: Anthropic's Messages API (API key required)
//! - **OpenAI**: OpenAI's Chat Completions API (API key required)
//!
//! Any client can be wrapped in a [`RetryingClient`] to retry transient failures.

pub mod claude;
pub mod factory;
mod http;
pub mod openai;
pub mod retry;

use async_trait::async_trait;
use sitewright_abstraction::{CompletionClient, CompletionError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use claude::ClaudeClient;
pub use factory::{ClientConfig, ClientFactory, ProviderKind};
pub use http::classify_status;
pub use openai::OpenAIClient;
pub use retry::{RetryPolicy, RetryingClient};

type Responder = dyn Fn(&str, &str, usize) -> Result<String, CompletionError> + Send + Sync;

/// A recorded call made against a [`MockClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// System prompt as submitted.
    pub system_prompt: String,
    /// User prompt as submitted.
    pub user_prompt: String,
}

/// A scripted implementation of `CompletionClient` for tests and offline runs.
///
/// Responses are served from a queue in order; once the queue is drained the
/// fallback responder (if any) answers, otherwise the call fails with
/// `CompletionError::Other`.
pub struct MockClient {
    id: String,
    queue: Mutex<VecDeque<Result<String, CompletionError>>>,
    responder: Option<Arc<Responder>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl std::fmt::Debug for MockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClient")
            .field("id", &self.id)
            .field("delay", &self.delay)
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl MockClient {
    /// Creates a mock that serves `responses` in order.
    #[must_use]
    pub fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            id: "mock".to_string(),
            queue: Mutex::new(responses.into()),
            responder: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock that answers every call through `responder`.
    ///
    /// The responder receives the system prompt, the user prompt and the
    /// zero-based call index.
    #[must_use]
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str, &str, usize) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        let mut mock = Self::new(Vec::new());
        mock.responder = Some(Arc::new(responder));
        mock
    }

    /// Makes every call wait `delay` before answering. The wait honors cancellation.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Appends a response to the queue.
    pub fn push(&self, response: Result<String, CompletionError>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(response);
        }
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(
        &self,
        cancel: &CancellationToken,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        let index = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|e| CompletionError::Other(format!("mock state poisoned: {e}")))?;
            calls.push(RecordedCall {
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
            });
            calls.len() - 1
        };

        debug!(client_id = %self.id, call = index, prompt_len = user_prompt.len(), "MockClient completing");

        if let Some(delay) = self.delay {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CompletionError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        } else if cancel.is_cancelled() {
            return Err(CompletionError::Cancelled);
        }

        let queued = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match (queued, &self.responder) {
            (Some(response), _) => response,
            (None, Some(responder)) => responder(system_prompt, user_prompt, index),
            (None, None) => Err(CompletionError::Other("mock response queue exhausted".to_string())),
        }
    }

    fn client_id(&self) -> &str {
        &self.id
    }
}
