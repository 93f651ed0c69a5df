//! Argument groups shared by several commands.

use anyhow::Context;
use clap::Args;
use sitewright_core::{PlanningRequest, SitewrightConfig};
use std::path::PathBuf;

/// What site to plan.
#[derive(Args, Debug, Clone)]
pub struct SiteArgs {
    /// Site name
    #[arg(long)]
    pub name: String,

    /// Site type (blog, docs, portfolio, business, landing)
    #[arg(long = "type", value_name = "TYPE")]
    pub site_type: String,

    /// What the site is about
    #[arg(long)]
    pub description: String,

    /// Intended audience
    #[arg(long)]
    pub audience: Option<String>,

    /// Writing tone
    #[arg(long)]
    pub tone: Option<String>,

    /// Public base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Theme identifier
    #[arg(long)]
    pub theme: Option<String>,

    /// Content path that already exists (repeatable)
    #[arg(long = "existing", value_name = "PATH")]
    pub existing_pages: Vec<String>,

    /// File with notes about the theme's layouts and parameters
    #[arg(long, value_name = "FILE")]
    pub theme_notes: Option<PathBuf>,
}

impl SiteArgs {
    /// Builds the planning request for a site rooted at `site_path`.
    pub fn to_request(&self, site_path: PathBuf) -> anyhow::Result<PlanningRequest> {
        let theme_notes = match &self.theme_notes {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read theme notes from {}", path.display()))?,
            ),
            None => None,
        };
        Ok(PlanningRequest {
            audience: self.audience.clone(),
            tone: self.tone.clone(),
            base_url: self.base_url.clone(),
            theme: self.theme.clone(),
            site_path: Some(site_path),
            existing_pages: self.existing_pages.clone(),
            theme_notes,
            ..PlanningRequest::new(&self.name, &self.site_type, &self.description)
        })
    }
}

/// How to generate pages.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerationArgs {
    /// Site root that content paths are written under
    #[arg(long, value_name = "DIR")]
    pub content_root: Option<PathBuf>,

    /// Regenerate pages whose file already exists
    #[arg(long)]
    pub overwrite: bool,

    /// Stop at the first failed page
    #[arg(long)]
    pub stop_on_error: bool,

    /// Generate without writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Attempts per page
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Deadline for the whole run, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl GenerationArgs {
    /// Applies the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut SitewrightConfig) {
        let generation = &mut config.generation;
        if let Some(root) = &self.content_root {
            generation.content_root = Some(root.clone());
        }
        if self.overwrite {
            generation.overwrite_existing = Some(true);
        }
        if self.stop_on_error {
            generation.continue_on_error = Some(false);
        }
        if self.dry_run {
            generation.dry_run = Some(true);
        }
        if let Some(max_attempts) = self.max_attempts {
            generation.max_attempts = Some(max_attempts);
        }
        if let Some(secs) = self.timeout {
            config.pipeline.run_timeout_secs = Some(secs);
        }
    }
}
