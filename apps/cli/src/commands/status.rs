//! Status command implementation.
//!
//! Shows the saved plan.

use super::render;
use anyhow::Context;
use colored::Colorize;
use sitewright_core::{PlanStore, SitewrightConfig};

/// Execute the status command.
pub fn execute(config: &SitewrightConfig, json_output: bool) -> anyhow::Result<()> {
    let store = PlanStore::new(config.pipeline_config().plan_path);
    let plan = store.load().with_context(|| format!("Failed to read plan at {}", store.path().display()))?;

    match (plan, json_output) {
        (Some(plan), true) => println!("{}", serde_json::to_string_pretty(&plan)?),
        (Some(plan), false) => render::print_plan(&plan),
        (None, true) => println!("null"),
        (None, false) => {
            println!("{} {}", "No plan found at".yellow(), store.path().display());
            println!("  {}", "Create one with: sitewright plan --name <NAME> --type <TYPE> --description <TEXT>".dimmed());
        }
    }
    Ok(())
}
