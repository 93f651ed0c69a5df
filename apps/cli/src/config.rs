//! CLI configuration loading and overrides.

use anyhow::Context;
use sitewright_core::SitewrightConfig;
use std::path::{Path, PathBuf};

/// Loads configuration.
///
/// With an explicit `path` only that file is read. Otherwise the global and
/// local files are discovered. Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SitewrightConfig> {
    match path {
        Some(path) => {
            let mut config = SitewrightConfig::load_from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            config.apply_env(|name| std::env::var(name).ok());
            Ok(config)
        }
        None => SitewrightConfig::discover_and_load().context("Failed to load configuration"),
    }
}

/// Values given on the command line, which beat every other source.
#[derive(Debug, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub plan_path: Option<PathBuf>,
}

pub fn apply_overrides(config: &mut SitewrightConfig, overrides: &Overrides) {
    if let Some(provider) = &overrides.provider {
        config.provider.kind = Some(provider.clone());
    }
    if let Some(model) = &overrides.model {
        config.provider.model = Some(model.clone());
    }
    if let Some(plan_path) = &overrides.plan_path {
        config.planning.plan_path = Some(plan_path.clone());
    }
}
