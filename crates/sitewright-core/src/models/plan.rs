//! Plan data structures for Sitewright.
//!
//! A [`Plan`] is the persisted unit of work: site metadata plus the ordered
//! [`Page`] entries to generate, each tracked through its own lifecycle.

use super::frontmatter::Frontmatter;
use crate::error::{Result, SitewrightError};
use crate::generation::GeneratorOutput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Schema version written to and required from persisted plans.
pub const PLAN_SCHEMA_VERSION: &str = "1.0";

/// Every page path starts with this prefix.
pub const CONTENT_ROOT_PREFIX: &str = "content/";

/// Paths that resolve to the home page regardless of declared type.
pub const ROOT_INDEX_PATHS: [&str; 2] = ["content/_index.md", "content/index.md"];

/// Kind of site being planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    /// Posts plus supporting pages.
    Blog,
    /// Documentation site.
    Docs,
    /// Showcase of projects.
    Portfolio,
    /// Company or service site.
    Business,
    /// Single landing page.
    Landing,
}

impl SiteType {
    /// All site types.
    pub const ALL: [Self; 5] = [Self::Blog, Self::Docs, Self::Portfolio, Self::Business, Self::Landing];

    /// Fewest pages a valid plan of this type may contain.
    pub const fn min_pages(self) -> usize {
        match self {
            Self::Blog => 5,
            Self::Docs | Self::Business => 4,
            Self::Portfolio => 3,
            Self::Landing => 1,
        }
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Docs => "docs",
            Self::Portfolio => "portfolio",
            Self::Business => "business",
            Self::Landing => "landing",
        }
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteType {
    type Err = SitewrightError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| SitewrightError::InvalidSiteType(s.to_string()))
    }
}

/// Role of a page within the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// Site root.
    Home,
    /// Dated article.
    Post,
    /// Index of a section.
    Section,
    /// Documentation page.
    Docs,
    /// Any other standalone page.
    Page,
}

impl PageType {
    /// Normalizes a type tag case-insensitively; `None` when unrecognized.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "home" => Some(Self::Home),
            "post" => Some(Self::Post),
            "section" => Some(Self::Section),
            "docs" => Some(Self::Docs),
            "page" => Some(Self::Page),
            _ => None,
        }
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Post => "post",
            Self::Section => "section",
            Self::Docs => "docs",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Planned, generation not started.
    #[default]
    Pending,
    /// Generation is running (or was interrupted by a crash).
    InProgress,
    /// Every page completed or was skipped.
    Completed,
    /// The run ended with failed or unprocessed pages.
    Partial,
    /// The run aborted before recording any result.
    Failed,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Completed => write!(f, "Completed"),
            Self::Partial => write!(f, "Partial"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Page status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Waiting to be generated.
    #[default]
    Pending,
    /// Being generated.
    InProgress,
    /// Content written.
    Completed,
    /// Generation failed.
    Failed,
    /// Destination already existed.
    Skipped,
}

impl PageStatus {
    /// Whether the page will not be processed again.
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Aggregate page counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    /// Number of pages in the plan.
    pub total_pages: usize,
    /// Pages with content written.
    pub completed_pages: usize,
    /// Pages whose generation failed.
    pub failed_pages: usize,
    /// Pages skipped because the destination existed.
    pub skipped_pages: usize,
}

impl PlanStats {
    /// Pages that reached a terminal status.
    pub const fn processed(&self) -> usize {
        self.completed_pages + self.failed_pages + self.skipped_pages
    }

    /// Fraction of pages processed, in `0.0..=1.0`.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.processed() as f64 / self.total_pages as f64
    }
}

/// One planned content unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Unique within the plan.
    pub id: String,
    /// Destination path, starting with `content/`.
    pub path: String,
    /// Role of the page.
    pub page_type: PageType,
    /// First directory segment of the path.
    pub content_type: String,
    /// Page title.
    pub title: String,
    /// What the page is about.
    #[serde(default)]
    pub description: String,
    /// Frontmatter fields to emit.
    #[serde(default, skip_serializing_if = "Frontmatter::is_empty")]
    pub frontmatter: Frontmatter,
    /// Outline bullets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outline: Vec<String>,
    /// Internal link targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    /// Execution status.
    #[serde(default)]
    pub status: PageStatus,
    /// Generation attempts made across all runs.
    #[serde(default)]
    pub attempts: u32,
    /// Last error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When content was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl Page {
    /// Creates a pending page.
    pub fn new(id: impl Into<String>, path: impl Into<String>, title: impl Into<String>, page_type: PageType) -> Self {
        let path = path.into();
        Self {
            id: id.into(),
            content_type: content_type_for(&path),
            path,
            page_type,
            title: title.into(),
            description: String::new(),
            frontmatter: Frontmatter::new(),
            outline: Vec::new(),
            links: Vec::new(),
            status: PageStatus::Pending,
            attempts: 0,
            error: None,
            generated_at: None,
        }
    }

    /// Whether this page is the site's home page.
    pub fn is_home(&self) -> bool {
        self.page_type == PageType::Home || is_root_index(&self.path)
    }

    /// Whether the file name is an index file (`_index.md` / `index.md`).
    pub fn is_index(&self) -> bool {
        is_index_file(&self.path)
    }

    /// Section directly under the content root, if the page lives in one.
    pub fn section(&self) -> Option<&str> {
        let rest = strip_content_prefix(&self.path)?;
        let (section, _) = rest.split_once('/')?;
        (!section.is_empty()).then_some(section)
    }
}

/// Content type of a path: its first directory under the content root, or
/// `page` for files directly in it.
pub fn content_type_for(path: &str) -> String {
    strip_content_prefix(path)
        .and_then(|rest| rest.split_once('/'))
        .map_or_else(|| "page".to_string(), |(first, _)| first.to_lowercase())
}

/// Whether `path` names the root index file.
pub fn is_root_index(path: &str) -> bool {
    ROOT_INDEX_PATHS.iter().any(|p| p.eq_ignore_ascii_case(path.trim()))
}

/// Whether the last path segment is an index file.
pub fn is_index_file(path: &str) -> bool {
    let file = path.rsplit('/').next().unwrap_or(path).to_lowercase();
    file == "_index.md" || file == "index.md"
}

fn strip_content_prefix(path: &str) -> Option<&str> {
    let prefix_len = CONTENT_ROOT_PREFIX.len();
    path.get(..prefix_len)
        .filter(|p| p.eq_ignore_ascii_case(CONTENT_ROOT_PREFIX))
        .map(|_| &path[prefix_len..])
}

/// A site plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan id.
    pub id: String,
    /// Schema version.
    pub version: String,
    /// Site name.
    pub site_name: String,
    /// Site type.
    pub site_type: SiteType,
    /// Site description.
    pub description: String,
    /// Intended audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Writing tone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    /// Public base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Theme identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Site directory the plan was made for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_path: Option<PathBuf>,
    /// Pages in generation order.
    pub pages: Vec<Page>,
    /// Plan status.
    pub status: PlanStatus,
    /// Page counts, derived from page statuses.
    pub stats: PlanStats,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
    /// When generation first started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the last run finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Plan {
    /// Creates an empty pending plan with a fresh id.
    pub fn new(site_name: impl Into<String>, site_type: SiteType, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            version: PLAN_SCHEMA_VERSION.to_string(),
            site_name: site_name.into(),
            site_type,
            description: description.into(),
            audience: None,
            tone: None,
            base_url: None,
            theme: None,
            site_path: None,
            pages: Vec::new(),
            status: PlanStatus::Pending,
            stats: PlanStats::default(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Recomputes [`PlanStats`] from page statuses.
    pub fn refresh_stats(&mut self) {
        let count = |status: PageStatus| self.pages.iter().filter(|p| p.status == status).count();
        self.stats = PlanStats {
            total_pages: self.pages.len(),
            completed_pages: count(PageStatus::Completed),
            failed_pages: count(PageStatus::Failed),
            skipped_pages: count(PageStatus::Skipped),
        };
    }

    /// Marks the plan modified.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Looks up a page by id.
    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Pages still waiting for generation.
    pub fn pending_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| p.status == PageStatus::Pending)
    }

    /// Number of pages that failed or were never processed.
    pub fn unfinished_count(&self) -> usize {
        self.pages.iter().filter(|p| !p.status.is_done()).count()
    }

    /// Returns pages left `InProgress` by an interrupted run to `Pending`.
    ///
    /// Returns the number of pages reset.
    pub fn reset_interrupted(&mut self) -> usize {
        let mut reset = 0;
        for page in self.pages.iter_mut().filter(|p| p.status == PageStatus::InProgress) {
            page.status = PageStatus::Pending;
            reset += 1;
        }
        if reset > 0 {
            self.refresh_stats();
            self.touch();
        }
        reset
    }

    /// Returns `Failed` pages to `Pending` so the next run retries them.
    /// The error and attempt count are kept until the page is processed.
    ///
    /// Returns the number of pages reopened.
    pub fn reopen_failed(&mut self) -> usize {
        let mut reopened = 0;
        for page in self.pages.iter_mut().filter(|p| p.status == PageStatus::Failed) {
            page.status = PageStatus::Pending;
            reopened += 1;
        }
        if reopened > 0 {
            self.refresh_stats();
            self.touch();
        }
        reopened
    }

    /// Folds one generation result into the matching page.
    ///
    /// A cancelled page goes back to `Pending` so a later resume retries it.
    pub fn apply_output(&mut self, output: &GeneratorOutput) -> Result<()> {
        let index = self
            .pages
            .iter()
            .position(|p| p.id == output.page_id)
            .ok_or_else(|| SitewrightError::PageNotFound(output.page_id.clone()))?;
        self.apply_output_at(index, output)
    }

    /// Records a generation result on the page at `index`.
    ///
    /// # Errors
    ///
    /// Returns `PageNotFound` when `index` is out of range or the page there
    /// has a different id.
    pub fn apply_output_at(&mut self, index: usize, output: &GeneratorOutput) -> Result<()> {
        let page = self
            .pages
            .get_mut(index)
            .filter(|p| p.id == output.page_id)
            .ok_or_else(|| SitewrightError::PageNotFound(output.page_id.clone()))?;
        page.attempts += output.attempts;
        if output.skipped {
            page.status = PageStatus::Skipped;
            page.error = None;
        } else if output.success {
            page.status = PageStatus::Completed;
            page.error = None;
            page.generated_at = Some(Utc::now());
        } else {
            page.error = output.error.as_ref().map(ToString::to_string);
            page.status = if output.is_cancelled() { PageStatus::Pending } else { PageStatus::Failed };
        }
        self.refresh_stats();
        self.touch();
        Ok(())
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {}, {}/{} pages done, {} failed, {} skipped",
            self.site_name,
            self.site_type,
            self.status,
            self.stats.completed_pages + self.stats.skipped_pages,
            self.stats.total_pages,
            self.stats.failed_pages,
            self.stats.skipped_pages,
        )
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Plan {} [{}]", self.id, self.version)?;
        writeln!(f, "{}", self.summary())?;
        for page in &self.pages {
            write!(f, "  {:<11} {:<8} {}", page.status.to_string(), page.page_type.as_str(), page.path)?;
            if let Some(error) = &page.error {
                write!(f, "  ({error})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_plan() -> Plan {
        let mut plan = Plan::new("My Blog", SiteType::Blog, "tech blog");
        plan.pages.push(Page::new("home", "content/_index.md", "Home", PageType::Home));
        plan.pages.push(Page::new("post-1", "content/posts/first.md", "First", PageType::Post));
        plan.pages.push(Page::new("about", "content/about.md", "About", PageType::Page));
        plan.refresh_stats();
        plan
    }

    fn output(page_id: &str, success: bool, skipped: bool, error: Option<SitewrightError>) -> GeneratorOutput {
        GeneratorOutput {
            page_id: page_id.to_string(),
            path: String::new(),
            success,
            skipped,
            content: None,
            attempts: u32::from(!skipped),
            duration: Duration::ZERO,
            error,
        }
    }

    #[test]
    fn test_site_type_parse() {
        assert_eq!("Blog".parse::<SiteType>().unwrap(), SiteType::Blog);
        assert_eq!(" docs ".parse::<SiteType>().unwrap(), SiteType::Docs);
        assert!(matches!("wiki".parse::<SiteType>(), Err(SitewrightError::InvalidSiteType(_))));
        assert!(SiteType::Blog.min_pages() > SiteType::Landing.min_pages());
    }

    #[test]
    fn test_page_type_parse_is_case_insensitive() {
        assert_eq!(PageType::parse("HOME"), Some(PageType::Home));
        assert_eq!(PageType::parse("Section"), Some(PageType::Section));
        assert_eq!(PageType::parse("landing"), None);
    }

    #[test]
    fn test_page_path_helpers() {
        let post = Page::new("p", "content/posts/first.md", "First", PageType::Post);
        assert_eq!(post.content_type, "posts");
        assert_eq!(post.section(), Some("posts"));
        assert!(!post.is_index());

        let about = Page::new("a", "content/about.md", "About", PageType::Page);
        assert_eq!(about.content_type, "page");
        assert_eq!(about.section(), None);

        let root = Page::new("h", "Content/_index.md", "Home", PageType::Page);
        assert!(root.is_home());
        assert!(root.is_index());
    }

    #[test]
    fn test_refresh_stats_tracks_statuses() {
        let mut plan = sample_plan();
        assert_eq!(plan.stats.total_pages, 3);
        assert_eq!(plan.stats.processed(), 0);

        plan.apply_output(&output("home", true, false, None)).unwrap();
        plan.apply_output(&output("post-1", true, true, None)).unwrap();
        plan.apply_output(&output("about", false, false, Some(SitewrightError::EmptyPlan))).unwrap();

        assert_eq!(plan.stats.completed_pages, 1);
        assert_eq!(plan.stats.skipped_pages, 1);
        assert_eq!(plan.stats.failed_pages, 1);
        assert_eq!(plan.stats.processed(), plan.stats.total_pages);
        assert!((plan.stats.fraction() - 1.0).abs() < f64::EPSILON);
        assert_eq!(plan.page("about").unwrap().status, PageStatus::Failed);
        assert!(plan.page("about").unwrap().error.is_some());
        assert!(plan.page("home").unwrap().generated_at.is_some());
    }

    #[test]
    fn test_cancelled_output_returns_page_to_pending() {
        let mut plan = sample_plan();
        plan.apply_output(&output("home", false, false, Some(SitewrightError::Cancelled))).unwrap();
        let page = plan.page("home").unwrap();
        assert_eq!(page.status, PageStatus::Pending);
        assert_eq!(page.attempts, 1);
        assert_eq!(plan.stats.processed(), 0);
    }

    #[test]
    fn test_apply_output_unknown_page() {
        let mut plan = sample_plan();
        let result = plan.apply_output(&output("missing", true, false, None));
        assert!(matches!(result, Err(SitewrightError::PageNotFound(_))));
    }

    #[test]
    fn test_apply_output_at_targets_position() {
        let mut plan = sample_plan();
        plan.pages[2].id = "home".to_string();

        plan.apply_output_at(2, &output("home", true, false, None)).unwrap();

        assert_eq!(plan.pages[0].status, PageStatus::Pending);
        assert_eq!(plan.pages[2].status, PageStatus::Completed);
        assert!(matches!(
            plan.apply_output_at(1, &output("home", true, false, None)),
            Err(SitewrightError::PageNotFound(_))
        ));
        assert!(plan.apply_output_at(9, &output("home", true, false, None)).is_err());
    }

    #[test]
    fn test_reset_interrupted() {
        let mut plan = sample_plan();
        plan.pages[1].status = PageStatus::InProgress;
        assert_eq!(plan.reset_interrupted(), 1);
        assert_eq!(plan.pending_pages().count(), 3);
    }

    #[test]
    fn test_reopen_failed_keeps_history() {
        let mut plan = sample_plan();
        plan.pages[0].status = PageStatus::Failed;
        plan.pages[0].attempts = 3;
        plan.pages[0].error = Some("boom".to_string());
        plan.refresh_stats();
        assert_eq!(plan.stats.failed_pages, 1);

        assert_eq!(plan.reopen_failed(), 1);
        assert_eq!(plan.stats.failed_pages, 0);
        assert_eq!(plan.pages[0].status, PageStatus::Pending);
        assert_eq!(plan.pages[0].attempts, 3);
        assert_eq!(plan.reopen_failed(), 0);
    }

    #[test]
    fn test_plan_serialization_roundtrip() {
        let plan = sample_plan();
        let json = serde_json::to_string_pretty(&plan).unwrap();
        assert!(json.contains("\"version\": \"1.0\""));
        assert!(json.contains("\"site_type\": \"blog\""));
        let back: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }
}
