//! Plan generation through the completion service.

use super::parser::PlanParser;
use super::request::PlanningRequest;
use super::validator::PlanValidator;
use crate::call::complete_with_deadline;
use crate::error::{Result, SitewrightError};
use crate::models::Plan;
use crate::progress::{self, EventKind, Phase, ProgressEvent, ProgressObserver};
use crate::prompts::PromptBuilder;
use sitewright_abstraction::CompletionClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for planning.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Deadline for the planning call, independent of the client's own.
    pub timeout: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(180) }
    }
}

/// Turns a planning request into a validated [`Plan`].
///
/// One completion call per plan. The planner never persists anything.
pub struct Planner {
    client: Arc<dyn CompletionClient>,
    prompts: Arc<dyn PromptBuilder>,
    config: PlannerConfig,
    observer: ProgressObserver,
}

impl Planner {
    /// Creates a planner with a no-op observer.
    pub fn new(client: Arc<dyn CompletionClient>, prompts: Arc<dyn PromptBuilder>, config: PlannerConfig) -> Self {
        Self { client, prompts, config, observer: progress::noop() }
    }

    /// Replaces the progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Plans a site.
    ///
    /// # Errors
    ///
    /// - `Validation` before any network call when the request is unusable
    /// - `Cancelled` / `Timeout` when the call is interrupted
    /// - `Planner` wrapping a completion or prompt failure
    /// - `Parse` when the response is not a plan
    /// - `PlanInvalid` / `EmptyPlan` when the plan fails validation
    pub async fn plan(&self, cancel: &CancellationToken, request: &PlanningRequest) -> Result<Plan> {
        let site_type = request.validate()?;

        self.emit(ProgressEvent::new(
            Phase::Planning,
            EventKind::Start,
            format!("Planning {site_type} site {:?}", request.site_name.trim()),
        ));

        let result = self.plan_validated(cancel, request, site_type).await;
        if let Err(err) = &result {
            warn!(site = %request.site_name, error = %err, "Planning failed");
            self.emit(ProgressEvent::new(Phase::Planning, EventKind::Error, format!("Planning failed: {err}")));
        }
        result
    }

    async fn plan_validated(
        &self,
        cancel: &CancellationToken,
        request: &PlanningRequest,
        site_type: crate::models::SiteType,
    ) -> Result<Plan> {
        let prompts = self
            .prompts
            .plan_prompts(request)
            .map_err(|e| SitewrightError::Planner { stage: "prompt".to_string(), source: Box::new(e.into()) })?;

        debug!(
            client_id = %self.client.client_id(),
            timeout_secs = self.config.timeout.as_secs(),
            "Requesting site plan"
        );
        let response = complete_with_deadline(self.client.as_ref(), cancel, &prompts, self.config.timeout, "planning call")
            .await
            .map_err(|e| match e {
                SitewrightError::Cancelled | SitewrightError::Timeout { .. } => e,
                other => SitewrightError::Planner { stage: "completion".to_string(), source: Box::new(other) },
            })?;

        let parsed = PlanParser::parse(&response)?;
        if let Some(tag) = parsed.site.site_type.as_deref() {
            if !tag.trim().eq_ignore_ascii_case(site_type.as_str()) {
                debug!(requested = %site_type, returned = tag, "Ignoring site type returned by planner");
            }
        }

        let mut plan = Plan::new(request.site_name.trim(), site_type, request.description.trim());
        plan.audience = request.audience.clone().or(parsed.site.audience);
        plan.tone = request.tone.clone().or(parsed.site.tone);
        plan.base_url = request.base_url.clone().or(parsed.site.base_url);
        plan.theme = request.theme.clone().or(parsed.site.theme);
        plan.site_path = request.site_path.clone();
        plan.pages = parsed.pages;

        let repaired = PlanValidator::validate_and_repair(&mut plan)?;
        for id in &repaired {
            if let Some(page) = plan.page(id) {
                self.emit(
                    ProgressEvent::new(
                        Phase::Planning,
                        EventKind::Repair,
                        format!("Added missing section index {}", page.path),
                    )
                    .with_page(page)
                    .with_stats(&plan.stats),
                );
            }
        }

        info!(
            plan_id = %plan.id,
            site = %plan.site_name,
            pages = plan.pages.len(),
            repaired = repaired.len(),
            "Site plan ready"
        );
        self.emit(
            ProgressEvent::new(
                Phase::Planning,
                EventKind::Complete,
                format!("Planned {} pages", plan.pages.len()),
            )
            .with_stats(&plan.stats),
        );
        Ok(plan)
    }

    fn emit(&self, event: ProgressEvent) {
        (self.observer)(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageType, PlanStatus, SiteType};
    use crate::progress::ProgressRecorder;
    use crate::prompts::TemplatePromptBuilder;
    use sitewright_abstraction::CompletionError;
    use sitewright_models::MockClient;

    const DOCS_PLAN: &str = r#"{"site": {"name": "ignored", "type": "docs", "tone": "friendly"},
        "pages": [
            {"path": "content/_index.md", "title": "Home"},
            {"path": "content/docs/install.md", "title": "Install"},
            {"path": "content/docs/configure.md", "title": "Configure"},
            {"path": "content/about.md", "title": "About"}
        ]}"#;

    fn planner(client: Arc<MockClient>) -> Planner {
        Planner::new(client, Arc::new(TemplatePromptBuilder::default()), PlannerConfig::default())
    }

    #[tokio::test]
    async fn test_plan_repairs_and_reports() {
        let client = Arc::new(MockClient::new(vec![Ok(DOCS_PLAN.to_string())]));
        let recorder = ProgressRecorder::new();
        let planner = planner(Arc::clone(&client)).with_observer(recorder.observer());

        let request = PlanningRequest::new("Handbook", "docs", "team handbook");
        let plan = planner.plan(&CancellationToken::new(), &request).await.unwrap();

        assert_eq!(plan.site_name, "Handbook");
        assert_eq!(plan.site_type, SiteType::Docs);
        assert_eq!(plan.tone.as_deref(), Some("friendly"));
        assert_eq!(plan.status, PlanStatus::Pending);
        assert_eq!(plan.pages.len(), 5);
        assert_eq!(plan.stats.total_pages, 5);
        assert_eq!(plan.page("section-docs").unwrap().page_type, PageType::Section);
        assert_eq!(client.call_count(), 1);

        let kinds: Vec<EventKind> = recorder.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Start, EventKind::Repair, EventKind::Complete]);
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_call() {
        let client = Arc::new(MockClient::new(vec![Ok(DOCS_PLAN.to_string())]));
        let planner = planner(Arc::clone(&client));

        let request = PlanningRequest::new("Handbook", "wiki", "team handbook");
        let err = planner.plan(&CancellationToken::new(), &request).await.unwrap_err();

        assert!(matches!(err, SitewrightError::Validation { .. }));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_completion_failure_is_wrapped() {
        let client = Arc::new(MockClient::new(vec![Err(CompletionError::Auth("bad key".to_string()))]));
        let err = planner(client)
            .plan(&CancellationToken::new(), &PlanningRequest::new("H", "docs", "d"))
            .await
            .unwrap_err();

        assert!(matches!(err, SitewrightError::Planner { ref stage, .. } if stage == "completion"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unparseable_response() {
        let client = Arc::new(MockClient::new(vec![Ok("I cannot help with that.".to_string())]));
        let err = planner(client)
            .plan(&CancellationToken::new(), &PlanningRequest::new("H", "docs", "d"))
            .await
            .unwrap_err();
        assert!(matches!(err, SitewrightError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_too_few_pages_is_invalid() {
        let response = r#"{"site": {}, "pages": [{"path": "content/_index.md", "title": "Home"}]}"#;
        let client = Arc::new(MockClient::new(vec![Ok(response.to_string())]));
        let err = planner(client)
            .plan(&CancellationToken::new(), &PlanningRequest::new("H", "blog", "d"))
            .await
            .unwrap_err();
        assert!(matches!(err, SitewrightError::PlanInvalid(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_planning_call_deadline() {
        let client = Arc::new(MockClient::new(vec![Ok(DOCS_PLAN.to_string())]).delayed(Duration::from_secs(600)));
        let planner = Planner::new(
            client,
            Arc::new(TemplatePromptBuilder::default()),
            PlannerConfig { timeout: Duration::from_secs(5) },
        );
        let err = planner
            .plan(&CancellationToken::new(), &PlanningRequest::new("H", "docs", "d"))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
