//! Sitewright Core - plan-then-generate content for static sites.
//!
//! This crate provides the generation pipeline, including:
//! - Planning a site from a short description with one completion call
//! - Generating every planned page with per-attempt deadlines and retry
//! - A resumable plan persisted after every page
//! - Progress events for observers
//!
//! # Example
//!
//! ```rust,no_run
//! use sitewright_core::{PlanningRequest, SitewrightConfig, progress};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> sitewright_core::Result<()> {
//!     let config = SitewrightConfig::discover_and_load()?;
//!     let pipeline = config.build_pipeline(config.build_client()?, progress::logging())?;
//!     let request = PlanningRequest::new("Acme Docs", "docs", "Documentation for the Acme CLI");
//!     let result = pipeline.run(&CancellationToken::new(), &request).await?;
//!     println!("{}", result.plan.summary());
//!     Ok(())
//! }
//! ```

mod call;
pub mod config;
pub mod error;
pub mod generation;
pub mod markup;
pub mod models;
pub mod pipeline;
pub mod planning;
pub mod progress;
pub mod prompts;

pub use config::SitewrightConfig;
pub use error::{PipelineError, Result, SitewrightError};
pub use generation::{ContentStore, FsContentStore, Generator, GeneratorConfig, GeneratorOutput};
pub use models::{
    Frontmatter, FrontmatterValue, Page, PageStatus, PageType, Plan, PlanStats, PlanStatus, SiteType,
};
pub use pipeline::{Pipeline, PipelineConfig, PipelineResult, PlanStore};
pub use planning::{PlanValidator, Planner, PlannerConfig, PlanningRequest};
pub use progress::{EventKind, Phase, ProgressEvent, ProgressObserver, ProgressRecorder};
pub use prompts::{PromptBuilder, PromptPair, PromptTemplates, TemplatePromptBuilder};
