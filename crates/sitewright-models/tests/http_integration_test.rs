//! Integration tests for the HTTP completion clients against a mock server.

use sitewright_abstraction::{CompletionClient, CompletionError};
use sitewright_models::{ClaudeClient, OpenAIClient, RetryPolicy, RetryingClient};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn claude(server: &mockito::Server) -> ClaudeClient {
    ClaudeClient::with_api_key("claude-test".to_string(), "test-key".to_string(), Duration::from_secs(5))
        .unwrap()
        .with_base_url(server.url())
}

fn openai(server: &mockito::Server) -> OpenAIClient {
    OpenAIClient::with_api_key("gpt-test".to_string(), "test-key".to_string(), Duration::from_secs(5))
        .unwrap()
        .with_base_url(server.url())
}

#[tokio::test]
async fn test_claude_success_sends_system_field() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/messages")
        .match_header("x-api-key", "test-key")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"system":"be terse","model":"claude-test"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"content":[{"type":"text","text":"hello"}],"usage":{"input_tokens":1,"output_tokens":1}}"#)
        .create_async()
        .await;

    let text = claude(&server)
        .complete(&CancellationToken::new(), "be terse", "say hi")
        .await
        .unwrap();

    assert_eq!(text, "hello");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_claude_maps_auth_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/messages")
        .with_status(401)
        .with_body(r#"{"error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
        .create_async()
        .await;

    let err = claude(&server).complete(&CancellationToken::new(), "", "hi").await.unwrap_err();
    assert!(matches!(err, CompletionError::Auth(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_claude_maps_rate_limit_with_retry_after() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/messages")
        .with_status(429)
        .with_header("retry-after", "7")
        .with_body(r#"{"error":{"type":"rate_limit_error"}}"#)
        .create_async()
        .await;

    let err = claude(&server).complete(&CancellationToken::new(), "", "hi").await.unwrap_err();
    assert_eq!(err, CompletionError::RateLimited { retry_after_secs: Some(7) });
}

#[tokio::test]
async fn test_claude_empty_text_is_empty_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/messages")
        .with_status(200)
        .with_body(r#"{"content":[]}"#)
        .create_async()
        .await;

    let err = claude(&server).complete(&CancellationToken::new(), "", "hi").await.unwrap_err();
    assert_eq!(err, CompletionError::EmptyResponse);
}

#[tokio::test]
async fn test_openai_success_and_bad_request() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(mockito::Matcher::PartialJsonString(r#"{"model":"ok"}"#.to_string()))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"generated"}}]}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::PartialJsonString(r#"{"model":"gpt-test"}"#.to_string()))
        .with_status(400)
        .with_body("bad request")
        .create_async()
        .await;

    let ok_client = OpenAIClient::with_api_key("ok".to_string(), "test-key".to_string(), Duration::from_secs(5))
        .unwrap()
        .with_base_url(server.url());
    let text = ok_client.complete(&CancellationToken::new(), "sys", "user").await.unwrap();
    assert_eq!(text, "generated");

    let err = openai(&server).complete(&CancellationToken::new(), "sys", "user").await.unwrap_err();
    assert!(matches!(err, CompletionError::BadRequest(_)));
}

#[tokio::test]
async fn test_retrying_client_exhausts_retries_on_503() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let policy = RetryPolicy {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    };
    let client = RetryingClient::new(openai(&server), policy);

    let result = client.complete(&CancellationToken::new(), "", "hi").await;

    assert!(matches!(result, Err(CompletionError::Server { status: 503, .. })));
    failing.assert_async().await;
}

#[tokio::test]
async fn test_cancelled_before_send() {
    let server = mockito::Server::new_async().await;
    let token = CancellationToken::new();
    token.cancel();

    let err = openai(&server).complete(&token, "", "hi").await.unwrap_err();
    assert_eq!(err, CompletionError::Cancelled);
}
