//! Completion client abstraction for Sitewright.
//!
//! This module defines the contract between the generation pipeline and the
//! remote text-completion service: a single request/response call that takes
//! a system prompt, a user prompt and a cancellation token, and yields either
//! generated text or a classified [`CompletionError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Represents an error that can occur when calling the completion service.
///
/// Each variant is a distinguishable failure category; [`CompletionError::is_retryable`]
/// decides from the category alone, except for [`CompletionError::Other`] which is
/// classified from its message text.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionError {
    /// The service rejected the credentials (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The service rejected the request as malformed (HTTP 400/404/413/422).
    #[error("malformed request: {0}")]
    BadRequest(String),

    /// Rate limit or quota hit (HTTP 429/402).
    #[error("rate limited{}", retry_after_secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited {
        /// Seconds the service asked us to wait, if it said so.
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after_secs: Option<u64>,
    },

    /// Transient server-side failure (HTTP 5xx).
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The service answered successfully but without any text.
    #[error("empty response from completion service")]
    EmptyResponse,

    /// Transport-level failure (connection refused/reset, DNS, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The call did not finish before its deadline.
    #[error("completion request timed out after {0}s")]
    Timeout(u64),

    /// The caller cancelled the call.
    #[error("completion request cancelled")]
    Cancelled,

    /// No client is configured (missing provider or API key).
    #[error("completion client not configured: {0}")]
    NotConfigured(String),

    /// The response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Unclassified failure.
    #[error("{0}")]
    Other(String),
}

impl CompletionError {
    /// Returns true if the same request may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. }
            | Self::Server { .. }
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::EmptyResponse => true,
            Self::Auth(_)
            | Self::BadRequest(_)
            | Self::Cancelled
            | Self::NotConfigured(_)
            | Self::Serialization(_) => false,
            Self::Other(message) => is_transient_message(message),
        }
    }

    /// Short machine-friendly name of the category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::BadRequest(_) => "bad_request",
            Self::RateLimited { .. } => "rate_limited",
            Self::Server { .. } => "server",
            Self::EmptyResponse => "empty_response",
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::NotConfigured(_) => "not_configured",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

const TRANSIENT_KEYWORDS: &[&str] = &[
    "timeout",
    "timed out",
    "deadline exceeded",
    "connection refused",
    "connection reset",
    "temporarily unavailable",
    "service unavailable",
    "rate limit",
    "rate-limit",
    "too many requests",
    "429",
    "502",
    "503",
    "504",
];

const PERMANENT_KEYWORDS: &[&str] = &[
    "unauthorized",
    "forbidden",
    "authentication",
    "invalid api key",
    "bad request",
    "malformed",
    "validation",
    "401",
    "403",
    "400",
];

/// Textual fallback classification for failures that carry no structured kind.
///
/// Permanent indicators win over transient ones, so "400 bad request: timeout field
/// invalid" is not retried.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    if PERMANENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return false;
    }
    TRANSIENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// A text-completion service.
///
/// Implementations must be `Send + Sync` so a single client can be shared by the
/// planner and the generator.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Submits a prompt pair and returns the generated text.
    ///
    /// Implementations must return [`CompletionError::Cancelled`] promptly once
    /// `cancel` fires.
    ///
    /// # Errors
    /// Returns a classified `CompletionError` if generation fails.
    async fn complete(
        &self,
        cancel: &CancellationToken,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError>;

    /// Returns an identifier for logs (provider and model).
    fn client_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_retryability() {
        assert!(CompletionError::RateLimited { retry_after_secs: None }.is_retryable());
        assert!(
            CompletionError::Server { status: 503, message: "busy".to_string() }.is_retryable()
        );
        assert!(CompletionError::Network("connection reset".to_string()).is_retryable());
        assert!(CompletionError::Timeout(30).is_retryable());
        assert!(!CompletionError::Auth("bad key".to_string()).is_retryable());
        assert!(!CompletionError::BadRequest("missing field".to_string()).is_retryable());
        assert!(!CompletionError::Cancelled.is_retryable());
        assert!(!CompletionError::NotConfigured("no key".to_string()).is_retryable());
    }

    #[test]
    fn test_other_falls_back_to_text() {
        assert!(CompletionError::Other("upstream temporarily unavailable".to_string()).is_retryable());
        assert!(CompletionError::Other("HTTP 504 gateway".to_string()).is_retryable());
        assert!(!CompletionError::Other("something odd".to_string()).is_retryable());
    }

    #[test]
    fn test_permanent_keywords_win() {
        assert!(!is_transient_message("400 bad request: timeout must be positive"));
        assert!(!is_transient_message("401 Unauthorized"));
        assert!(is_transient_message("deadline exceeded while reading body"));
    }

    #[test]
    fn test_display() {
        let err = CompletionError::RateLimited { retry_after_secs: Some(12) };
        assert_eq!(err.to_string(), "rate limited (retry after 12s)");
        assert_eq!(CompletionError::RateLimited { retry_after_secs: None }.to_string(), "rate limited");
        assert_eq!(err.kind(), "rate_limited");
    }
}
