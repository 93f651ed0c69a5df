//! The plan-then-generate pipeline.
//!
//! The pipeline owns the persisted plan for the duration of a run. It plans
//! (or resumes), generates every pending page strictly in order, folds each
//! page result into the plan, saves after every page and once more at the
//! end, whatever the outcome.
//!
//! Plan status moves `Pending → InProgress → {Completed | Partial | Failed}`.
//! Each run processes the pages that are not done yet: pending pages, pages
//! left in progress by a crash, and pages that failed in an earlier run.

pub mod store;

pub use store::{PLAN_FILE, PlanStore, STATE_DIR};

use crate::error::{PipelineError, Result, SitewrightError};
use crate::generation::{Generator, GeneratorOutput};
use crate::models::{PLAN_SCHEMA_VERSION, PageStatus, Plan, PlanStatus};
use crate::planning::{PlanValidator, Planner, PlanningRequest};
use crate::progress::{self, EventKind, Phase, ProgressEvent, ProgressObserver};
use chrono::Utc;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Configuration for pipeline runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where the plan document lives.
    pub plan_path: PathBuf,
    /// Keep generating after a page fails.
    pub continue_on_error: bool,
    /// Deadline for a whole run, planning included.
    pub run_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { plan_path: PlanStore::default_path(), continue_on_error: true, run_timeout: None }
    }
}

/// Outcome of a pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    /// Final plan state, as persisted.
    pub plan: Plan,
    /// Page results of this run, in processing order.
    pub outputs: Vec<GeneratorOutput>,
    /// Whether the run finished with every page completed or skipped.
    pub success: bool,
    /// Whether the run continued a persisted plan.
    pub resumed: bool,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// Where the plan was persisted.
    pub plan_path: PathBuf,
}

/// Cancellation scope of one run: the caller's token plus an optional
/// run deadline.
struct RunScope {
    caller: CancellationToken,
    token: CancellationToken,
    timeout: Option<Duration>,
    timer: Option<JoinHandle<()>>,
}

impl RunScope {
    fn start(caller: &CancellationToken, timeout: Option<Duration>) -> Self {
        let token = caller.child_token();
        let timer = timeout.map(|after| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                debug!(timeout_ms = after.as_millis(), "Run deadline reached");
                token.cancel();
            })
        });
        Self { caller: caller.clone(), token, timeout, timer }
    }

    /// The error describing why the run token fired.
    fn interruption(&self) -> SitewrightError {
        match self.timeout {
            Some(after) if !self.caller.is_cancelled() => {
                SitewrightError::Timeout { operation: "pipeline run".to_string(), after }
            }
            _ => SitewrightError::Cancelled,
        }
    }

    fn classify(&self, err: SitewrightError) -> SitewrightError {
        if err.is_cancelled() && self.token.is_cancelled() { self.interruption() } else { err }
    }
}

impl Drop for RunScope {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Sequences planning and generation over a persisted plan.
pub struct Pipeline {
    planner: Planner,
    generator: Generator,
    store: PlanStore,
    config: PipelineConfig,
    observer: ProgressObserver,
}

impl Pipeline {
    /// Creates a pipeline persisting to `config.plan_path`.
    pub fn new(planner: Planner, generator: Generator, config: PipelineConfig) -> Self {
        Self {
            planner,
            generator,
            store: PlanStore::new(config.plan_path.clone()),
            config,
            observer: progress::noop(),
        }
    }

    /// Replaces the pipeline's own progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    /// The plan store.
    pub fn store(&self) -> &PlanStore {
        &self.store
    }

    /// Plans (or resumes) and generates.
    ///
    /// A persisted plan that is not `Completed` is resumed without calling
    /// the planner. Otherwise a fresh plan is made and saved first.
    ///
    /// # Errors
    ///
    /// - store errors (`PlanVersionMismatch`, `PlanInvalid`, `Io`) as is
    /// - `Pipeline` with phase `Planning` when planning fails
    /// - `Pipeline` with phase `Generating`, carrying the [`PipelineResult`],
    ///   when generation is cancelled, times out, or stops on a page failure
    pub async fn run(&self, cancel: &CancellationToken, request: &PlanningRequest) -> Result<PipelineResult> {
        let started = Instant::now();
        let scope = RunScope::start(cancel, self.config.run_timeout);

        match self.store.load()? {
            Some(plan) if plan.status != PlanStatus::Completed => {
                PlanValidator::validate_structure(&plan)?;
                info!(plan_id = %plan.id, status = %plan.status, "Resuming persisted plan");
                return self.execute(&scope, plan, started, true).await;
            }
            Some(plan) => debug!(plan_id = %plan.id, "Previous plan completed, planning a new one"),
            None => {}
        }

        let plan = match self.planner.plan(&scope.token, request).await {
            Ok(plan) => plan,
            Err(err) => {
                let err = scope.classify(err);
                error!(error = %err, "Run aborted during planning");
                self.emit(ProgressEvent::new(
                    Phase::Completed,
                    EventKind::Complete,
                    format!("Run aborted during planning: {err}"),
                ));
                return Err(PipelineError { phase: Phase::Planning, partial: false, source: err, result: None }.into());
            }
        };
        self.store.save(&plan)?;
        self.execute(&scope, plan, started, false).await
    }

    /// Continues the persisted plan.
    ///
    /// # Errors
    ///
    /// - `PlanNotFound` when no plan is persisted
    /// - `PlanAlreadyCompleted` when there is nothing to resume
    /// - see [`Self::run`] for generation errors
    pub async fn resume(&self, cancel: &CancellationToken) -> Result<PipelineResult> {
        let started = Instant::now();
        let plan = self.store.load_required()?;
        if plan.status == PlanStatus::Completed {
            return Err(SitewrightError::PlanAlreadyCompleted(plan.id));
        }
        PlanValidator::validate_structure(&plan)?;
        info!(plan_id = %plan.id, pending = plan.unfinished_count(), "Resuming plan");
        let scope = RunScope::start(cancel, self.config.run_timeout);
        self.execute(&scope, plan, started, true).await
    }

    /// Plans and persists without generating.
    ///
    /// # Errors
    ///
    /// Returns the planner's error, or a store error.
    pub async fn plan(&self, cancel: &CancellationToken, request: &PlanningRequest) -> Result<Plan> {
        let scope = RunScope::start(cancel, self.config.run_timeout);
        let plan = self.planner.plan(&scope.token, request).await.map_err(|e| scope.classify(e))?;
        self.store.save(&plan)?;
        info!(plan_id = %plan.id, path = %self.store.path().display(), "Plan saved");
        Ok(plan)
    }

    /// Generates a caller-supplied plan, persisting it to the store.
    ///
    /// # Errors
    ///
    /// Returns `PlanVersionMismatch`, `PlanInvalid` or `EmptyPlan` for an
    /// unusable plan; see [`Self::run`] for generation errors.
    pub async fn generate(&self, cancel: &CancellationToken, plan: Plan) -> Result<PipelineResult> {
        if plan.version != PLAN_SCHEMA_VERSION {
            return Err(SitewrightError::PlanVersionMismatch {
                expected: PLAN_SCHEMA_VERSION.to_string(),
                found: plan.version,
            });
        }
        PlanValidator::validate_structure(&plan)?;
        let started = Instant::now();
        let scope = RunScope::start(cancel, self.config.run_timeout);
        self.execute(&scope, plan, started, false).await
    }

    /// The persisted plan, if any.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn status(&self) -> Result<Option<Plan>> {
        self.store.load()
    }

    async fn execute(&self, scope: &RunScope, mut plan: Plan, started: Instant, resumed: bool) -> Result<PipelineResult> {
        let reset = plan.reset_interrupted();
        if reset > 0 {
            warn!(plan_id = %plan.id, pages = reset, "Pages left in progress by an earlier run were reset");
        }
        let reopened = plan.reopen_failed();
        if reopened > 0 {
            info!(plan_id = %plan.id, pages = reopened, "Retrying pages that failed in an earlier run");
        }
        plan.refresh_stats();
        plan.status = PlanStatus::InProgress;
        plan.started_at = Some(Utc::now());
        plan.completed_at = None;
        plan.touch();
        if let Err(err) = self.store.save(&plan) {
            return Err(PipelineError { phase: Phase::Generating, partial: false, source: err, result: None }.into());
        }

        let pending = plan.pending_pages().count();
        info!(plan_id = %plan.id, pending, total = plan.pages.len(), resumed, "Generating pages");
        self.emit(
            ProgressEvent::new(
                Phase::Generating,
                EventKind::Start,
                format!("Generating {pending} of {} pages", plan.pages.len()),
            )
            .with_stats(&plan.stats),
        );

        let mut outputs: Vec<GeneratorOutput> = Vec::new();
        let mut stop: Option<SitewrightError> = None;

        for index in 0..plan.pages.len() {
            if plan.pages[index].status != PageStatus::Pending {
                continue;
            }
            if scope.token.is_cancelled() {
                stop = Some(scope.interruption());
                break;
            }

            plan.pages[index].status = PageStatus::InProgress;
            let page = plan.pages[index].clone();
            let output = self.generator.generate_page(&scope.token, &plan, &page).await;
            let cancelled = output.is_cancelled();
            let failure = (!output.success && !cancelled).then(|| SitewrightError::PageFailed {
                page_id: output.page_id.clone(),
                path: output.path.clone(),
                message: output.error.as_ref().map_or_else(|| "unknown error".to_string(), ToString::to_string),
            });

            if let Err(err) = plan.apply_output_at(index, &output) {
                outputs.push(output);
                stop = Some(err);
                break;
            }
            outputs.push(output);

            if let Err(err) = self.store.save(&plan) {
                error!(plan_id = %plan.id, error = %err, "Could not save plan progress");
                stop = Some(err);
                break;
            }
            if cancelled {
                stop = Some(scope.interruption());
                break;
            }
            if let Some(failure) = failure {
                if !self.config.continue_on_error {
                    warn!(page_id = %page.id, "Stopping after page failure");
                    stop = Some(failure);
                    break;
                }
            }
        }

        self.finish(plan, outputs, stop, started, resumed)
    }

    fn finish(
        &self,
        mut plan: Plan,
        outputs: Vec<GeneratorOutput>,
        stop: Option<SitewrightError>,
        started: Instant,
        resumed: bool,
    ) -> Result<PipelineResult> {
        let partial = outputs.iter().any(|o| !o.is_cancelled()) || plan.pages.iter().any(|p| p.status.is_done());
        plan.status = match &stop {
            Some(_) if !partial => PlanStatus::Failed,
            _ if plan.pages.iter().all(|p| p.status.is_done()) => PlanStatus::Completed,
            _ => PlanStatus::Partial,
        };
        plan.completed_at = Some(Utc::now());
        plan.refresh_stats();
        plan.touch();
        let saved = self.store.save(&plan);
        if let Err(err) = &saved {
            error!(plan_id = %plan.id, error = %err, "Could not save final plan state");
        }

        let stats = plan.stats;
        info!(
            plan_id = %plan.id,
            status = %plan.status,
            completed = stats.completed_pages,
            failed = stats.failed_pages,
            skipped = stats.skipped_pages,
            total = stats.total_pages,
            "Run finished"
        );
        self.emit(
            ProgressEvent::new(
                Phase::Completed,
                EventKind::Complete,
                format!(
                    "{}: {} completed, {} failed, {} skipped of {} pages",
                    plan.status, stats.completed_pages, stats.failed_pages, stats.skipped_pages, stats.total_pages
                ),
            )
            .with_stats(&stats),
        );

        let success = stop.is_none() && plan.status == PlanStatus::Completed;
        let result = PipelineResult {
            plan,
            outputs,
            success,
            resumed,
            duration: started.elapsed(),
            plan_path: self.store.path().to_path_buf(),
        };

        match (stop, saved) {
            (None, Ok(())) => Ok(result),
            (Some(source), _) | (None, Err(source)) => Err(PipelineError {
                phase: Phase::Generating,
                partial,
                source,
                result: Some(Box::new(result)),
            }
            .into()),
        }
    }

    fn emit(&self, event: ProgressEvent) {
        (self.observer)(&event);
    }
}
