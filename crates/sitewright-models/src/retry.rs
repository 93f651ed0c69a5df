//! Client-level retry of transient completion failures.

use async_trait::async_trait;
use sitewright_abstraction::{CompletionClient, CompletionError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry policy for a single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential backoff).
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Calculate the delay for a given retry (zero-based).
    ///
    /// Uses exponential backoff: initial_delay * multiplier^retry, capped at max_delay.
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let delay_ms = (self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent))
            .min(self.max_delay.as_millis() as f64);
        Duration::from_millis(delay_ms.max(0.0) as u64)
    }
}

/// Wraps a client and retries retryable failures with growing backoff.
///
/// A rate-limit answer that names a retry-after longer than the computed delay
/// is honored, still bounded by `max_delay`.
#[derive(Debug)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: CompletionClient> RetryingClient<C> {
    /// Wraps `inner` with `policy`.
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: CompletionClient> CompletionClient for RetryingClient<C> {
    async fn complete(
        &self,
        cancel: &CancellationToken,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        let mut retry = 0;
        loop {
            let error = match self.inner.complete(cancel, system_prompt, user_prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if cancel.is_cancelled() {
                return Err(CompletionError::Cancelled);
            }
            if !error.is_retryable() || retry >= self.policy.max_retries {
                debug!(client_id = %self.inner.client_id(), retries = retry, error = %error, "Giving up on completion");
                return Err(error);
            }

            let mut delay = self.policy.calculate_delay(retry);
            if let CompletionError::RateLimited { retry_after_secs: Some(secs) } = &error {
                delay = delay.max(Duration::from_secs(*secs)).min(self.policy.max_delay);
            }
            warn!(
                client_id = %self.inner.client_id(),
                retry = retry + 1,
                delay_ms = delay.as_millis(),
                error = %error,
                "Retrying completion after transient failure"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CompletionError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            retry += 1;
        }
    }

    fn client_id(&self) -> &str {
        self.inner.client_id()
    }
}
