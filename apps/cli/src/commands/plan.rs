//! Plan command implementation.
//!
//! Plans a site and saves the plan without generating any page.

use super::types::SiteArgs;
use super::{cancel_on_ctrl_c, render};
use anyhow::Context;
use colored::Colorize;
use sitewright_core::SitewrightConfig;

/// Execute the plan command.
pub async fn execute(config: &SitewrightConfig, site: &SiteArgs) -> anyhow::Result<()> {
    println!("{}", "sitewright plan".bold().cyan());
    println!();

    let request = site.to_request(config.content_root())?;
    let client = config.build_client().context("Failed to create completion client")?;
    let pipeline = config.build_pipeline(client, render::observer()).context("Failed to set up pipeline")?;

    let plan = pipeline.plan(&cancel_on_ctrl_c(), &request).await.context("Planning failed")?;

    println!();
    render::print_plan(&plan);
    println!();
    println!("Plan saved to {}", pipeline.store().path().display().to_string().green());
    println!("Generate it with {}", "sitewright resume".bold());
    Ok(())
}
