//! Planning request and its input validation.

use crate::error::{Result, SitewrightError};
use crate::models::SiteType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningRequest {
    /// Site name.
    pub site_name: String,
    /// Site type as given by the caller, validated against [`SiteType`].
    pub site_type: String,
    /// What the site is about.
    pub description: String,
    /// Intended audience.
    #[serde(default)]
    pub audience: Option<String>,
    /// Writing tone.
    #[serde(default)]
    pub tone: Option<String>,
    /// Public base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Theme identifier.
    #[serde(default)]
    pub theme: Option<String>,
    /// Site directory.
    #[serde(default)]
    pub site_path: Option<PathBuf>,
    /// Content paths that already exist in the site.
    #[serde(default)]
    pub existing_pages: Vec<String>,
    /// Notes about the theme's layouts and parameters.
    #[serde(default)]
    pub theme_notes: Option<String>,
}

impl PlanningRequest {
    /// Creates a request with the three required fields.
    pub fn new(site_name: impl Into<String>, site_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            site_type: site_type.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Checks required fields, returning the parsed site type.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the first offending field and the value
    /// received.
    pub fn validate(&self) -> Result<SiteType> {
        if self.site_name.trim().is_empty() {
            return Err(SitewrightError::validation("site_name", &self.site_name, "must not be blank"));
        }
        let site_type = self.site_type.parse::<SiteType>().map_err(|_| {
            SitewrightError::validation(
                "site_type",
                &self.site_type,
                "must be one of blog, docs, portfolio, business, landing",
            )
        })?;
        if self.description.trim().is_empty() {
            return Err(SitewrightError::validation("description", &self.description, "must not be blank"));
        }
        Ok(site_type)
    }
}
