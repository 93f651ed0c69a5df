//! HTTP helpers shared by the provider clients.

use reqwest::{RequestBuilder, Response, StatusCode};
use sitewright_abstraction::CompletionError;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Maps a non-success HTTP status and its body to a completion error category.
pub fn classify_status(status: StatusCode, body: &str, retry_after_secs: Option<u64>) -> CompletionError {
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        body.trim().to_string()
    };

    match status.as_u16() {
        401 | 402 | 403 => CompletionError::Auth(message),
        400 | 404 | 413 | 422 => CompletionError::BadRequest(message),
        429 => CompletionError::RateLimited { retry_after_secs },
        code @ 500..=599 => CompletionError::Server { status: code, message },
        code => CompletionError::Other(format!("unexpected status {code}: {message}")),
    }
}

/// Sends a request, racing it against `cancel`, and maps failures.
///
/// Returns the successful response; any non-2xx status is read and classified.
pub(crate) async fn send(
    request: RequestBuilder,
    cancel: &CancellationToken,
    provider: &str,
    timeout_secs: u64,
) -> Result<Response, CompletionError> {
    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(CompletionError::Cancelled),
        result = request.send() => result.map_err(|e| map_transport_error(&e, provider, timeout_secs))?,
    };

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    error!(provider = %provider, status = %status, error = %body, "Completion API returned error status");
    Err(classify_status(status, &body, retry_after))
}

fn map_transport_error(e: &reqwest::Error, provider: &str, timeout_secs: u64) -> CompletionError {
    error!(provider = %provider, error = %e, "Failed to send request to completion API");
    if e.is_timeout() {
        CompletionError::Timeout(timeout_secs)
    } else {
        CompletionError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(classify_status(StatusCode::UNAUTHORIZED, "", None), CompletionError::Auth(_)));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, "nope", None), CompletionError::Auth(_)));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "bad", None),
            CompletionError::BadRequest(m) if m == "bad"
        ));
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "", Some(3)),
            CompletionError::RateLimited { retry_after_secs: Some(3) }
        );
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "", None),
            CompletionError::Server { status: 502, .. }
        ));
        assert!(matches!(classify_status(StatusCode::IM_A_TEAPOT, "", None), CompletionError::Other(_)));
    }

    #[test]
    fn test_payment_required_is_not_retried() {
        let err = classify_status(StatusCode::PAYMENT_REQUIRED, "quota exhausted", Some(30));
        assert!(matches!(err, CompletionError::Auth(ref m) if m == "quota exhausted"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_empty_body_uses_reason() {
        let err = classify_status(StatusCode::SERVICE_UNAVAILABLE, "  ", None);
        assert_eq!(
            err,
            CompletionError::Server { status: 503, message: "Service Unavailable".to_string() }
        );
    }
}
