//! Error types for Sitewright Core.

use crate::pipeline::PipelineResult;
use crate::progress::Phase;
use crate::prompts::PromptError;
use sitewright_abstraction::{CompletionError, is_transient_message};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Core error type for Sitewright operations.
#[derive(Error, Debug)]
pub enum SitewrightError {
    /// Bad input detected before any network call.
    #[error("Validation error: {field} {message} (got {value:?})")]
    Validation {
        /// Offending field.
        field: String,
        /// Value received.
        value: String,
        /// What was wrong with it.
        message: String,
    },

    /// Completion text was not in an understood structure.
    #[error("Parse error: {message}; response excerpt: {excerpt:?}")]
    Parse {
        /// Underlying parse failure.
        message: String,
        /// Bounded excerpt of the offending text.
        excerpt: String,
    },

    /// Planning failed at the named stage.
    #[error("Planner error ({stage}): {source}")]
    Planner {
        /// Where planning failed.
        stage: String,
        /// Underlying cause.
        #[source]
        source: Box<SitewrightError>,
    },

    /// Generation of a single page failed.
    #[error("Generator error for page {page_id} ({path}) at attempt {attempt}: {source}")]
    Generator {
        /// Page identifier.
        page_id: String,
        /// Destination path.
        path: String,
        /// Attempt on which the failure was final.
        attempt: u32,
        /// Underlying cause.
        #[source]
        source: Box<SitewrightError>,
    },

    /// A page failed and the run was configured to stop on failures.
    #[error("Page {page_id} ({path}) failed: {message}")]
    PageFailed {
        /// Page identifier.
        page_id: String,
        /// Destination path.
        path: String,
        /// The page's terminal error.
        message: String,
    },

    /// A pipeline run ended with an error.
    #[error("{0}")]
    Pipeline(Box<PipelineError>),

    /// No persisted plan at the given path.
    #[error("Plan not found at {}", .0.display())]
    PlanNotFound(PathBuf),

    /// Plan is structurally invalid.
    #[error("Plan invalid: {0}")]
    PlanInvalid(String),

    /// Persisted plan has a different schema version.
    #[error("Plan version mismatch: expected {expected}, found {found}")]
    PlanVersionMismatch {
        /// Version this build reads and writes.
        expected: String,
        /// Version found in the document.
        found: String,
    },

    /// Plan contains no pages.
    #[error("Plan has no pages")]
    EmptyPlan,

    /// No page with the given id.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// Every attempt failed with a retryable error.
    #[error("Max retries exceeded after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        /// Attempts made.
        attempts: u32,
        /// The last failure.
        #[source]
        last: Box<SitewrightError>,
    },

    /// Operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Operation exceeded its deadline.
    #[error("Timeout: {operation} did not finish within {after:?}")]
    Timeout {
        /// What timed out.
        operation: String,
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// No usable completion client.
    #[error("Completion client not configured: {0}")]
    ClientNotConfigured(String),

    /// Site type outside the closed set.
    #[error("Invalid site type: {0:?} (expected one of blog, docs, portfolio, business, landing)")]
    InvalidSiteType(String),

    /// Caller-supplied input is unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resume was requested for a plan that already completed.
    #[error("Plan {0} is already completed")]
    PlanAlreadyCompleted(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Completion client errors
    #[error("Completion error: {0}")]
    Completion(CompletionError),

    /// Prompt rendering errors
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<CompletionError> for SitewrightError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::Cancelled => Self::Cancelled,
            CompletionError::NotConfigured(msg) => Self::ClientNotConfigured(msg),
            other => Self::Completion(other),
        }
    }
}

impl SitewrightError {
    /// Builds a validation error for `field`.
    pub fn validation(field: &str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.to_string(), value: value.into(), message: message.into() }
    }

    /// Whether retrying the failed operation could succeed.
    ///
    /// Structured kinds decide first. Only errors without a structured kind
    /// are classified from their message text.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Completion(err) => err.is_retryable(),
            Self::Timeout { .. } => true,
            Self::Planner { source, .. } | Self::Generator { source, .. } => source.is_retryable(),
            Self::Io(err) => {
                matches!(
                    err.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::Interrupted
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionRefused
                ) || is_transient_message(&err.to_string())
            }
            Self::Config(msg) => is_transient_message(msg),
            Self::Validation { .. }
            | Self::Parse { .. }
            | Self::Pipeline(_)
            | Self::PageFailed { .. }
            | Self::PlanNotFound(_)
            | Self::PlanInvalid(_)
            | Self::PlanVersionMismatch { .. }
            | Self::EmptyPlan
            | Self::PageNotFound(_)
            | Self::MaxRetriesExceeded { .. }
            | Self::Cancelled
            | Self::ClientNotConfigured(_)
            | Self::InvalidSiteType(_)
            | Self::InvalidInput(_)
            | Self::PlanAlreadyCompleted(_)
            | Self::Serialization(_)
            | Self::Prompt(_) => false,
        }
    }

    /// Whether this error, or the cause it wraps, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled)
    }

    /// Whether this error, or the cause it wraps, is a deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self.root_cause(), Self::Timeout { .. } | Self::Completion(CompletionError::Timeout(_)))
    }

    /// Follows wrapping variants down to the innermost error.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Planner { source, .. } | Self::Generator { source, .. } => source.root_cause(),
            Self::MaxRetriesExceeded { last, .. } => last.root_cause(),
            Self::Pipeline(err) => err.source.root_cause(),
            other => other,
        }
    }

    /// The pipeline result salvaged with this error, if any.
    pub fn pipeline_result(&self) -> Option<&PipelineResult> {
        match self {
            Self::Pipeline(err) => err.result.as_deref(),
            _ => None,
        }
    }
}

/// Error from a pipeline run, tagged with the phase it happened in.
#[derive(Debug, Error)]
#[error("Pipeline error during {phase} (partial: {partial}): {source}")]
pub struct PipelineError {
    /// Phase in which the run stopped.
    pub phase: Phase,
    /// Whether some page results were recorded before stopping.
    pub partial: bool,
    /// Underlying cause.
    #[source]
    pub source: SitewrightError,
    /// Results and final plan state, when generation had started.
    pub result: Option<Box<PipelineResult>>,
}

impl From<PipelineError> for SitewrightError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(Box::new(err))
    }
}

/// Result type alias for Sitewright operations.
pub type Result<T> = std::result::Result<T, SitewrightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_conversion() {
        let err: SitewrightError = CompletionError::Cancelled.into();
        assert!(matches!(err, SitewrightError::Cancelled));

        let err: SitewrightError = CompletionError::NotConfigured("no key".to_string()).into();
        assert!(matches!(err, SitewrightError::ClientNotConfigured(_)));

        let err: SitewrightError = CompletionError::BadRequest("bad".to_string()).into();
        assert!(matches!(err, SitewrightError::Completion(CompletionError::BadRequest(_))));
    }

    #[test]
    fn test_retryability_is_structural() {
        assert!(SitewrightError::from(CompletionError::RateLimited { retry_after_secs: None }).is_retryable());
        assert!(
            SitewrightError::Timeout { operation: "call".to_string(), after: Duration::from_secs(1) }
                .is_retryable()
        );
        assert!(!SitewrightError::from(CompletionError::Auth("denied".to_string())).is_retryable());
        assert!(!SitewrightError::validation("site_name", "", "must not be blank").is_retryable());
        assert!(!SitewrightError::Cancelled.is_retryable());
    }

    #[test]
    fn test_retryability_falls_back_to_text() {
        assert!(SitewrightError::Config("service temporarily unavailable".to_string()).is_retryable());
        assert!(!SitewrightError::Config("missing model".to_string()).is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset by peer");
        assert!(SitewrightError::from(io).is_retryable());
    }

    #[test]
    fn test_wrapped_errors_expose_root_cause() {
        let err = SitewrightError::Generator {
            page_id: "home".to_string(),
            path: "content/_index.md".to_string(),
            attempt: 3,
            source: Box::new(SitewrightError::MaxRetriesExceeded {
                attempts: 3,
                last: Box::new(SitewrightError::from(CompletionError::Server {
                    status: 503,
                    message: "busy".to_string(),
                })),
            }),
        };
        assert!(matches!(err.root_cause(), SitewrightError::Completion(CompletionError::Server { .. })));
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("content/_index.md"));
    }

    #[test]
    fn test_validation_display_names_field_and_value() {
        let err = SitewrightError::validation("site_type", "wiki", "must be a known site type");
        let text = err.to_string();
        assert!(text.contains("site_type"));
        assert!(text.contains("\"wiki\""));
    }
}
