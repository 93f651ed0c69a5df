//! Page generation with per-attempt deadlines, retry and backoff.

use super::content::ContentStore;
use crate::call::complete_with_deadline;
use crate::error::{Result, SitewrightError};
use crate::markup::{force_draft_false, strip_code_fences};
use crate::models::{Page, PageStatus, Plan};
use crate::progress::{self, EventKind, Phase, ProgressEvent, ProgressObserver};
use crate::prompts::{PromptBuilder, PromptPair};
use sitewright_abstraction::{CompletionClient, CompletionError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Longest pause between attempts, whatever the configured backoff.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(600);

/// Configuration for page generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Attempts per page, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Multiplier applied on top of the linear attempt factor.
    pub backoff_multiplier: f64,
    /// Deadline for one attempt (call plus post-processing).
    pub attempt_timeout: Duration,
    /// Regenerate pages whose destination already exists.
    pub overwrite_existing: bool,
    /// Report success without writing files.
    pub dry_run: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            attempt_timeout: Duration::from_secs(120),
            overwrite_existing: false,
            dry_run: false,
        }
    }
}

impl GeneratorConfig {
    /// Delay after failed attempt `attempt` (1-based):
    /// `base_delay × attempt × backoff_multiplier`, capped at [`MAX_RETRY_DELAY`].
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = f64::from(attempt) * self.backoff_multiplier.max(0.0);
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }
}

/// Result of generating one page. Never persisted.
#[derive(Debug)]
pub struct GeneratorOutput {
    /// Page id.
    pub page_id: String,
    /// Destination path.
    pub path: String,
    /// Whether the page ended successfully (generated or skipped).
    pub success: bool,
    /// Whether the destination existed and generation was skipped.
    pub skipped: bool,
    /// Generated content.
    pub content: Option<String>,
    /// Attempts made.
    pub attempts: u32,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Terminal error, if the page failed.
    pub error: Option<SitewrightError>,
}

impl GeneratorOutput {
    /// Whether the page stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(SitewrightError::is_cancelled)
    }
}

/// A batch that stopped early because of cancellation.
#[derive(Debug, Error)]
#[error("generation interrupted after {} pages: {error}", outputs.len())]
pub struct BatchInterrupted {
    /// Results recorded before the interruption.
    pub outputs: Vec<GeneratorOutput>,
    /// Why the batch stopped.
    pub error: SitewrightError,
}

/// Generates page content and writes it to a [`ContentStore`].
///
/// The generator never mutates a plan it is given; callers fold returned
/// [`GeneratorOutput`]s into their own plan.
pub struct Generator {
    client: Arc<dyn CompletionClient>,
    prompts: Arc<dyn PromptBuilder>,
    store: Arc<dyn ContentStore>,
    config: GeneratorConfig,
    observer: ProgressObserver,
}

impl Generator {
    /// Creates a generator with a no-op observer.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        prompts: Arc<dyn PromptBuilder>,
        store: Arc<dyn ContentStore>,
        config: GeneratorConfig,
    ) -> Self {
        Self { client, prompts, store, config, observer: progress::noop() }
    }

    /// Replaces the progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    /// The generator's configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates one page of `plan`.
    ///
    /// Emits at most one `PageStart`, a `Retry` before every later attempt,
    /// and exactly one terminal `PageDone`, `Skip` or `Error` event.
    pub async fn generate_page(&self, cancel: &CancellationToken, plan: &Plan, page: &Page) -> GeneratorOutput {
        let started = Instant::now();
        let mut output = GeneratorOutput {
            page_id: page.id.clone(),
            path: page.path.clone(),
            success: false,
            skipped: false,
            content: None,
            attempts: 0,
            duration: Duration::ZERO,
            error: None,
        };

        match self.should_skip(page) {
            Ok(true) => {
                debug!(page_id = %page.id, path = %page.path, "Destination exists, skipping");
                self.emit(plan, page, EventKind::Skip, format!("Skipped {} (already exists)", page.path));
                output.success = true;
                output.skipped = true;
                output.duration = started.elapsed();
                return output;
            }
            Ok(false) => {}
            Err(err) => return self.fail(plan, page, output, started, err),
        }

        let prompts = match self.prompts.page_prompts(plan, page) {
            Ok(prompts) => prompts,
            Err(err) => return self.fail(plan, page, output, started, err.into()),
        };

        self.emit(plan, page, EventKind::PageStart, format!("Generating {}", page.path));

        let max_attempts = self.config.max_attempts.max(1);
        loop {
            output.attempts += 1;
            let attempt = output.attempts;
            if attempt > 1 {
                self.emit(
                    plan,
                    page,
                    EventKind::Retry,
                    format!("Retrying {} (attempt {attempt}/{max_attempts})", page.path),
                );
            }

            let err = match self.attempt(cancel, &prompts, page, attempt).await {
                Ok(content) => match self.persist(page, &content).await {
                    Ok(()) => {
                        info!(page_id = %page.id, path = %page.path, attempts = attempt, "Page generated");
                        output.success = true;
                        output.content = Some(content);
                        output.duration = started.elapsed();
                        self.emit(plan, page, EventKind::PageDone, format!("Generated {}", page.path));
                        return output;
                    }
                    Err(err) => return self.fail(plan, page, output, started, err),
                },
                Err(err) => err,
            };

            if cancel.is_cancelled() {
                return self.fail(plan, page, output, started, SitewrightError::Cancelled);
            }
            if !err.is_retryable() {
                return self.fail(plan, page, output, started, err);
            }
            if attempt >= max_attempts {
                let exhausted = SitewrightError::MaxRetriesExceeded { attempts: attempt, last: Box::new(err) };
                return self.fail(plan, page, output, started, exhausted);
            }

            let delay = self.config.retry_delay(attempt);
            warn!(
                page_id = %page.id,
                attempt,
                delay_ms = delay.as_millis(),
                error = %err,
                "Page generation failed, backing off"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return self.fail(plan, page, output, started, SitewrightError::Cancelled);
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Generates every pending page of `plan` in order.
    ///
    /// Works on a private copy of the plan so progress reflects earlier
    /// results; `plan` itself is untouched. Page failures do not stop the
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns [`BatchInterrupted`] with the results so far when cancelled.
    pub async fn generate_all(
        &self,
        cancel: &CancellationToken,
        plan: &Plan,
    ) -> std::result::Result<Vec<GeneratorOutput>, BatchInterrupted> {
        let mut working = plan.clone();
        let mut outputs = Vec::new();

        for index in 0..working.pages.len() {
            if working.pages[index].status != PageStatus::Pending {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(BatchInterrupted { outputs, error: SitewrightError::Cancelled });
            }

            let page = working.pages[index].clone();
            let output = self.generate_page(cancel, &working, &page).await;
            let cancelled = output.is_cancelled();
            if let Err(err) = working.apply_output_at(index, &output) {
                error!(page_id = %page.id, error = %err, "Could not record page result");
            }
            outputs.push(output);
            if cancelled {
                return Err(BatchInterrupted { outputs, error: SitewrightError::Cancelled });
            }
        }
        Ok(outputs)
    }

    fn should_skip(&self, page: &Page) -> Result<bool> {
        if self.config.overwrite_existing {
            return Ok(false);
        }
        self.store.exists(&page.path)
    }

    async fn attempt(
        &self,
        cancel: &CancellationToken,
        prompts: &PromptPair,
        page: &Page,
        attempt: u32,
    ) -> Result<String> {
        debug!(page_id = %page.id, attempt, "Requesting page content");
        let operation = format!("generation of {} (attempt {attempt})", page.path);
        let raw = complete_with_deadline(self.client.as_ref(), cancel, prompts, self.config.attempt_timeout, &operation)
            .await?;
        let content = force_draft_false(strip_code_fences(&raw));
        if content.trim().is_empty() {
            return Err(CompletionError::EmptyResponse.into());
        }
        Ok(content)
    }

    async fn persist(&self, page: &Page, content: &str) -> Result<()> {
        if self.config.dry_run {
            debug!(path = %page.path, bytes = content.len(), "Dry run, not writing");
            return Ok(());
        }
        self.store.write(&page.path, content).await
    }

    fn fail(
        &self,
        plan: &Plan,
        page: &Page,
        mut output: GeneratorOutput,
        started: Instant,
        err: SitewrightError,
    ) -> GeneratorOutput {
        output.duration = started.elapsed();
        let err = if err.is_cancelled() {
            info!(page_id = %page.id, attempts = output.attempts, "Page generation cancelled");
            SitewrightError::Cancelled
        } else {
            error!(page_id = %page.id, attempts = output.attempts, error = %err, "Page generation failed");
            SitewrightError::Generator {
                page_id: page.id.clone(),
                path: page.path.clone(),
                attempt: output.attempts,
                source: Box::new(err),
            }
        };
        self.emit(plan, page, EventKind::Error, format!("Failed {}: {err}", page.path));
        output.error = Some(err);
        output
    }

    fn emit(&self, plan: &Plan, page: &Page, kind: EventKind, message: String) {
        let event = ProgressEvent::new(Phase::Generating, kind, message).with_page(page).with_stats(&plan.stats);
        (self.observer)(&event);
    }
}
