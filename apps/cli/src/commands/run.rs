//! Run command implementation.
//!
//! Plans (or resumes) and generates every page.

use super::types::SiteArgs;
use super::{cancel_on_ctrl_c, render};
use anyhow::{Context, bail};
use colored::Colorize;
use sitewright_core::{PipelineResult, SitewrightConfig, SitewrightError};

/// Execute the run command.
pub async fn execute(config: &SitewrightConfig, site: &SiteArgs) -> anyhow::Result<()> {
    println!("{}", "sitewright run".bold().cyan());
    println!();

    let request = site.to_request(config.content_root())?;
    let client = config.build_client().context("Failed to create completion client")?;
    let pipeline = config.build_pipeline(client, render::observer()).context("Failed to set up pipeline")?;

    let outcome = pipeline.run(&cancel_on_ctrl_c(), &request).await;
    report(outcome)
}

/// Prints the outcome of a generation run and turns anything short of
/// full success into an error.
pub fn report(outcome: Result<PipelineResult, SitewrightError>) -> anyhow::Result<()> {
    match outcome {
        Ok(result) => {
            render::print_result(&result);
            if !result.success {
                bail!(
                    "{} of {} pages failed; run `sitewright resume` to retry them",
                    result.plan.stats.failed_pages,
                    result.plan.stats.total_pages
                );
            }
            println!("{}", "All pages generated".green().bold());
            Ok(())
        }
        Err(err) => {
            if let Some(result) = err.pipeline_result() {
                render::print_result(result);
            }
            let hint = if err.is_cancelled() || err.is_timeout() { "; progress was saved" } else { "" };
            Err(anyhow::Error::new(err).context(format!("Run did not finish{hint}")))
        }
    }
}
