//! Resume command implementation.

use super::{cancel_on_ctrl_c, render, run};
use anyhow::Context;
use colored::Colorize;
use sitewright_core::SitewrightConfig;

/// Execute the resume command.
pub async fn execute(config: &SitewrightConfig) -> anyhow::Result<()> {
    println!("{}", "sitewright resume".bold().cyan());
    println!();

    let client = config.build_client().context("Failed to create completion client")?;
    let pipeline = config.build_pipeline(client, render::observer()).context("Failed to set up pipeline")?;

    run::report(pipeline.resume(&cancel_on_ctrl_c()).await)
}
