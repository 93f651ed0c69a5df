//! Progress bus.
//!
//! Planner, Generator and Pipeline report checkpoints through a
//! [`ProgressObserver`], a callback invoked synchronously and in order.
//! Observers compose by fan-out with [`combine`]; [`noop`] is the default.

use crate::models::{Page, PlanStats};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Pipeline phase an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Producing the plan.
    Planning,
    /// Generating pages.
    Generating,
    /// Run finished.
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Generating => write!(f, "generating"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A phase began.
    Start,
    /// A page's first attempt is about to run.
    PageStart,
    /// A page was generated.
    PageDone,
    /// A page is about to be retried.
    Retry,
    /// A page was skipped because its destination exists.
    Skip,
    /// A page or phase failed.
    Error,
    /// The plan was repaired during validation.
    Repair,
    /// A phase or run finished.
    Complete,
}

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
    /// Phase.
    pub phase: Phase,
    /// Kind.
    pub kind: EventKind,
    /// Human-readable message.
    pub message: String,
    /// Page id, for page events.
    pub page_id: Option<String>,
    /// Page path, for page events.
    pub page_path: Option<String>,
    /// Pages processed when the event was emitted.
    pub current: usize,
    /// Pages in the plan.
    pub total: usize,
}

impl ProgressEvent {
    /// Creates an event with no page and no progress.
    pub fn new(phase: Phase, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            phase,
            kind,
            message: message.into(),
            page_id: None,
            page_path: None,
            current: 0,
            total: 0,
        }
    }

    /// Attaches a page.
    #[must_use]
    pub fn with_page(mut self, page: &Page) -> Self {
        self.page_id = Some(page.id.clone());
        self.page_path = Some(page.path.clone());
        self
    }

    /// Attaches progress taken from plan statistics.
    #[must_use]
    pub fn with_stats(mut self, stats: &PlanStats) -> Self {
        self.current = stats.processed();
        self.total = stats.total_pages;
        self
    }

    /// `current / total`, or `0.0` with no pages.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Callback receiving every progress event.
pub type ProgressObserver = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// An observer that ignores everything.
pub fn noop() -> ProgressObserver {
    Arc::new(|_: &ProgressEvent| {})
}

/// Fans each event out to `observers` in order.
pub fn combine(observers: Vec<ProgressObserver>) -> ProgressObserver {
    Arc::new(move |event: &ProgressEvent| {
        for observer in &observers {
            observer(event);
        }
    })
}

/// An observer that writes each event to `tracing`.
pub fn logging() -> ProgressObserver {
    Arc::new(|event: &ProgressEvent| {
        let page = event.page_path.as_deref().unwrap_or("-");
        match event.kind {
            EventKind::Error => error!(
                phase = %event.phase,
                page = page,
                current = event.current,
                total = event.total,
                "{}",
                event.message
            ),
            EventKind::Retry | EventKind::Repair => warn!(
                phase = %event.phase,
                page = page,
                "{}",
                event.message
            ),
            EventKind::Start | EventKind::Complete => info!(
                phase = %event.phase,
                current = event.current,
                total = event.total,
                "{}",
                event.message
            ),
            EventKind::PageStart | EventKind::PageDone | EventKind::Skip => debug!(
                phase = %event.phase,
                page = page,
                current = event.current,
                total = event.total,
                "{}",
                event.message
            ),
        }
    })
}

/// Collects events in memory.
#[derive(Debug, Clone, Default)]
pub struct ProgressRecorder {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl ProgressRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer feeding this recorder.
    pub fn observer(&self) -> ProgressObserver {
        let events = Arc::clone(&self.events);
        Arc::new(move |event: &ProgressEvent| {
            if let Ok(mut events) = events.lock() {
                events.push(event.clone());
            }
        })
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Recorded events of one kind.
    pub fn events_of(&self, kind: EventKind) -> Vec<ProgressEvent> {
        self.events().into_iter().filter(|e| e.kind == kind).collect()
    }
}
