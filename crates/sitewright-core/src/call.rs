//! A single deadline-bounded completion call.

use crate::error::{Result, SitewrightError};
use crate::prompts::PromptPair;
use sitewright_abstraction::CompletionClient;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Calls `client` under a deadline scoped to this call.
///
/// The call runs on a child of `cancel`, so the deadline never cancels the
/// caller's token. A failure after `cancel` fired is reported as
/// `Cancelled`; an expired deadline as `Timeout`.
pub(crate) async fn complete_with_deadline(
    client: &dyn CompletionClient,
    cancel: &CancellationToken,
    prompts: &PromptPair,
    deadline: Duration,
    operation: &str,
) -> Result<String> {
    if cancel.is_cancelled() {
        return Err(SitewrightError::Cancelled);
    }

    let scoped = cancel.child_token();
    let call = client.complete(&scoped, &prompts.system, &prompts.user);
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) if cancel.is_cancelled() => {
            debug!(client_id = %client.client_id(), error = %err, "Completion ended by cancellation");
            Err(SitewrightError::Cancelled)
        }
        Ok(Err(err)) => Err(err.into()),
        Err(_) => {
            scoped.cancel();
            Err(SitewrightError::Timeout { operation: operation.to_string(), after: deadline })
        }
    }
}
