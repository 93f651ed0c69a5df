//! Content store the generator writes pages into.

use crate::error::{Result, SitewrightError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Hierarchical write target keyed by relative paths.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Whether something already exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for paths that escape the store.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Writes `content` to `path`, creating parent directories and replacing
    /// any existing file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for paths that escape the store, or `Io`.
    async fn write(&self, path: &str, content: &str) -> Result<()>;
}

/// [`ContentStore`] rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Creates a store rooted at `root` (the site directory).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins `path` onto the root, rejecting absolute paths and `..`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `path` would leave the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if path.trim().is_empty() || escapes {
            return Err(SitewrightError::InvalidInput(format!("content path {path:?} is outside the site root")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path)?.exists())
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;
        debug!(path = %target.display(), bytes = content.len(), "Wrote page content");
        Ok(())
    }
}
