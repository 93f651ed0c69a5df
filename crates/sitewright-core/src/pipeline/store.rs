//! Plan persistence.
//!
//! A plan lives in a single pretty-printed JSON document. Saves go through a
//! temporary file and a rename so a crash never leaves a truncated plan.

use crate::error::{Result, SitewrightError};
use crate::models::{PLAN_SCHEMA_VERSION, Plan};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding Sitewright state.
pub const STATE_DIR: &str = ".sitewright";

/// File name of the persisted plan.
pub const PLAN_FILE: &str = "plan.json";

/// Loads and saves the plan document.
#[derive(Debug, Clone)]
pub struct PlanStore {
    path: PathBuf,
}

impl PlanStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `./.sitewright/plan.json`, or `~/.sitewright/plan.json` when the
    /// working directory is unavailable.
    pub fn default_path() -> PathBuf {
        let base = std::env::current_dir()
            .ok()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        base.join(STATE_DIR).join(PLAN_FILE)
    }

    /// Document location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a plan document exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the plan, or `None` when no document exists.
    ///
    /// # Errors
    ///
    /// - `PlanVersionMismatch` when the document's version differs
    /// - `PlanInvalid` when the document is not a plan
    /// - `Io` on read failures
    pub fn load(&self) -> Result<Option<Plan>> {
        if !self.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;

        let document: serde_json::Value = serde_json::from_str(&json)
            .map_err(|e| SitewrightError::PlanInvalid(format!("{}: {e}", self.path.display())))?;
        let found = document.get("version").and_then(serde_json::Value::as_str).unwrap_or("");
        if found != PLAN_SCHEMA_VERSION {
            return Err(SitewrightError::PlanVersionMismatch {
                expected: PLAN_SCHEMA_VERSION.to_string(),
                found: found.to_string(),
            });
        }

        let mut plan: Plan = serde_json::from_value(document)
            .map_err(|e| SitewrightError::PlanInvalid(format!("{}: {e}", self.path.display())))?;
        plan.refresh_stats();
        debug!(path = %self.path.display(), plan_id = %plan.id, "Loaded plan");
        Ok(Some(plan))
    }

    /// Loads the plan, failing with `PlanNotFound` when absent.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_required(&self) -> Result<Plan> {
        self.load()?.ok_or_else(|| SitewrightError::PlanNotFound(self.path.clone()))
    }

    /// Writes the plan atomically with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Serialization` on failure.
    pub fn save(&self, plan: &Plan) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(plan)?;

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = open_private(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), plan_id = %plan.id, status = %plan.status, "Saved plan");
        Ok(())
    }

    /// Removes the plan document if present.
    ///
    /// # Errors
    ///
    /// Returns `Io` when removal fails.
    pub fn delete(&self) -> Result<()> {
        if self.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Page, PageStatus, PageType, SiteType};

    fn plan() -> Plan {
        let mut plan = Plan::new("Site", SiteType::Landing, "desc");
        plan.pages.push(Page::new("home", "content/_index.md", "Home", PageType::Home));
        plan.refresh_stats();
        plan
    }

    #[test]
    fn test_missing_document_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlanStore::new(dir.path().join("plan.json"));
        assert!(store.load().unwrap().is_none());
        assert!(matches!(store.load_required(), Err(SitewrightError::PlanNotFound(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlanStore::new(dir.path().join("nested/state/plan.json"));
        let mut plan = plan();
        plan.pages[0].status = PageStatus::Completed;
        plan.refresh_stats();

        store.save(&plan).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, plan);
        assert!(!dir.path().join("nested/state/plan.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = PlanStore::new(dir.path().join("plan.json"));
        store.save(&plan()).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlanStore::new(dir.path().join("plan.json"));
        let mut plan = plan();
        plan.version = "0.9".to_string();
        store.save(&plan).unwrap();

        match store.load() {
            Err(SitewrightError::PlanVersionMismatch { expected, found }) => {
                assert_eq!(expected, "1.0");
                assert_eq!(found, "0.9");
            }
            other => panic!("Expected version mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(PlanStore::new(&path).load(), Err(SitewrightError::PlanInvalid(_))));
    }

    #[test]
    fn test_load_recomputes_stale_stats() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlanStore::new(dir.path().join("plan.json"));
        let mut plan = plan();
        plan.pages[0].status = PageStatus::Failed;
        store.save(&plan).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.stats.failed_pages, 1);
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlanStore::new(dir.path().join("plan.json"));
        store.save(&plan()).unwrap();
        store.delete().unwrap();
        assert!(!store.exists());
        store.delete().unwrap();
    }

    #[test]
    fn test_default_path_shape() {
        let path = PlanStore::default_path();
        assert!(path.ends_with(".sitewright/plan.json"));
    }
}
