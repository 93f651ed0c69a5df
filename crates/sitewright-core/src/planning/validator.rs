//! Structural validation and repair of parsed plans.

use crate::error::{Result, SitewrightError};
use crate::models::{CONTENT_ROOT_PREFIX, Page, PageType, Plan};
use std::collections::HashSet;
use tracing::debug;

/// Sections that get an index page synthesized when missing.
pub const AUTO_INDEXED_SECTIONS: [&str; 5] = ["docs", "guides", "tutorials", "projects", "services"];

/// Pages a section needs before a missing index is synthesized.
const SECTION_INDEX_THRESHOLD: usize = 2;

/// Validates plans produced by the planner or supplied by callers.
pub struct PlanValidator;

impl PlanValidator {
    /// Runs every structural check in order; the first failure wins.
    ///
    /// 1. the plan has an id
    /// 2. the plan has pages
    /// 3. the page count meets the site type's minimum
    /// 4. page ids are unique
    /// 5. paths are non-empty, under `content/` and unique ignoring case
    /// 6. exactly one page is the home page
    ///
    /// # Errors
    ///
    /// Returns `PlanInvalid` or `EmptyPlan` describing the failed check.
    pub fn validate_structure(plan: &Plan) -> Result<()> {
        if plan.id.trim().is_empty() {
            return Err(SitewrightError::PlanInvalid("plan id is missing".to_string()));
        }
        if plan.pages.is_empty() {
            return Err(SitewrightError::EmptyPlan);
        }

        let min = plan.site_type.min_pages();
        if plan.pages.len() < min {
            return Err(SitewrightError::PlanInvalid(format!(
                "a {} site needs at least {min} pages, got {}",
                plan.site_type,
                plan.pages.len()
            )));
        }

        let mut ids = HashSet::new();
        if let Some(page) = plan.pages.iter().find(|p| !ids.insert(p.id.as_str())) {
            return Err(SitewrightError::PlanInvalid(format!("duplicate page id {:?}", page.id)));
        }

        let mut seen = HashSet::new();
        for (index, page) in plan.pages.iter().enumerate() {
            let path = page.path.trim();
            if path.is_empty() {
                return Err(SitewrightError::PlanInvalid(format!(
                    "page {index} ({}) has an empty path",
                    page.id
                )));
            }
            if !has_content_prefix(path) {
                return Err(SitewrightError::PlanInvalid(format!(
                    "page path {path:?} must start with {CONTENT_ROOT_PREFIX:?}"
                )));
            }
            if !seen.insert(path.to_lowercase()) {
                return Err(SitewrightError::PlanInvalid(format!("duplicate page path {path:?}")));
            }
        }

        let homes: Vec<&str> = plan.pages.iter().filter(|p| p.is_home()).map(|p| p.path.as_str()).collect();
        match homes.len() {
            1 => Ok(()),
            0 => Err(SitewrightError::PlanInvalid("plan has no home page".to_string())),
            _ => Err(SitewrightError::PlanInvalid(format!("plan has {} home pages: {}", homes.len(), homes.join(", ")))),
        }
    }

    /// Validates the plan, then appends an index page for every recognized
    /// section with several pages but no index.
    ///
    /// Returns the ids of the synthesized pages. Stats are refreshed.
    ///
    /// # Errors
    ///
    /// Returns the first structural failure; see [`Self::validate_structure`].
    pub fn validate_and_repair(plan: &mut Plan) -> Result<Vec<String>> {
        Self::validate_structure(plan)?;

        let mut added = Vec::new();
        for section in AUTO_INDEXED_SECTIONS {
            let in_section = |p: &&Page| p.section().is_some_and(|s| s.eq_ignore_ascii_case(section));
            let members = plan.pages.iter().filter(in_section).filter(|p| !p.is_index()).count();
            let has_index = plan.pages.iter().filter(in_section).any(Page::is_index);
            if members < SECTION_INDEX_THRESHOLD || has_index {
                continue;
            }

            let page = Self::section_index(plan, section);
            debug!(section, page_id = %page.id, "Synthesizing missing section index");
            added.push(page.id.clone());
            plan.pages.push(page);
        }

        plan.refresh_stats();
        Ok(added)
    }

    fn section_index(plan: &Plan, section: &str) -> Page {
        let base = format!("section-{section}");
        let mut id = base.clone();
        let mut n = 2;
        while plan.page(&id).is_some() {
            id = format!("{base}-{n}");
            n += 1;
        }

        let title = title_case(section);
        let mut page = Page::new(id, format!("{CONTENT_ROOT_PREFIX}{section}/_index.md"), title.clone(), PageType::Section);
        page.description = format!("Overview of the {title} section, introducing and linking its pages.");
        page.links = plan
            .pages
            .iter()
            .filter(|p| p.section() == Some(section))
            .map(|p| p.path.clone())
            .collect();
        page
    }
}

fn has_content_prefix(path: &str) -> bool {
    path.get(..CONTENT_ROOT_PREFIX.len()).is_some_and(|p| p.eq_ignore_ascii_case(CONTENT_ROOT_PREFIX))
}

/// `getting-started` → `Getting Started`.
pub fn title_case(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteType;

    fn plan_with(site_type: SiteType, paths: &[&str]) -> Plan {
        let mut plan = Plan::new("Site", site_type, "desc");
        for (i, path) in paths.iter().enumerate() {
            let page_type = if crate::models::is_root_index(path) { PageType::Home } else { PageType::Page };
            plan.pages.push(Page::new(format!("p{i}"), *path, format!("Page {i}"), page_type));
        }
        plan.refresh_stats();
        plan
    }

    #[test]
    fn test_valid_plan_passes() {
        let plan = plan_with(SiteType::Portfolio, &["content/_index.md", "content/about.md", "content/contact.md"]);
        assert!(PlanValidator::validate_structure(&plan).is_ok());
    }

    #[test]
    fn test_missing_id() {
        let mut plan = plan_with(SiteType::Landing, &["content/_index.md"]);
        plan.id = String::new();
        assert!(matches!(PlanValidator::validate_structure(&plan), Err(SitewrightError::PlanInvalid(_))));
    }

    #[test]
    fn test_empty_plan() {
        let plan = plan_with(SiteType::Landing, &[]);
        assert!(matches!(PlanValidator::validate_structure(&plan), Err(SitewrightError::EmptyPlan)));
    }

    #[test]
    fn test_minimum_page_count_message() {
        let plan = plan_with(SiteType::Blog, &["content/_index.md", "content/about.md"]);
        let err = PlanValidator::validate_structure(&plan).unwrap_err().to_string();
        assert!(err.contains("blog"));
        assert!(err.contains("at least 5"));
        assert!(err.contains("got 2"));
    }

    #[test]
    fn test_path_rules() {
        let outside = plan_with(SiteType::Landing, &["static/_index.md"]);
        assert!(PlanValidator::validate_structure(&outside).unwrap_err().to_string().contains("must start with"));

        let dup = plan_with(SiteType::Landing, &["content/_index.md", "content/About.md", "content/about.md"]);
        assert!(PlanValidator::validate_structure(&dup).unwrap_err().to_string().contains("duplicate"));

        let blank = plan_with(SiteType::Landing, &["content/_index.md", "  "]);
        assert!(PlanValidator::validate_structure(&blank).unwrap_err().to_string().contains("empty path"));
    }

    #[test]
    fn test_duplicate_page_ids() {
        let mut plan = plan_with(SiteType::Landing, &["content/_index.md", "content/a.md", "content/b.md"]);
        plan.pages[2].id = plan.pages[1].id.clone();

        let err = PlanValidator::validate_structure(&plan).unwrap_err();
        assert!(matches!(err, SitewrightError::PlanInvalid(_)));
        assert!(err.to_string().contains("duplicate page id \"p1\""));
    }

    #[test]
    fn test_home_page_count() {
        let none = plan_with(SiteType::Landing, &["content/about.md"]);
        assert!(PlanValidator::validate_structure(&none).unwrap_err().to_string().contains("no home page"));

        let mut two = plan_with(SiteType::Landing, &["content/_index.md", "content/welcome.md"]);
        two.pages[1].page_type = PageType::Home;
        assert!(PlanValidator::validate_structure(&two).unwrap_err().to_string().contains("2 home pages"));
    }

    #[test]
    fn test_repair_synthesizes_section_index() {
        let mut plan = plan_with(
            SiteType::Docs,
            &["content/_index.md", "content/docs/install.md", "content/docs/usage.md", "content/guides/one.md"],
        );
        let added = PlanValidator::validate_and_repair(&mut plan).unwrap();

        assert_eq!(added, vec!["section-docs"]);
        assert_eq!(plan.pages.len(), 5);
        assert_eq!(plan.stats.total_pages, 5);
        let index = plan.page("section-docs").unwrap();
        assert_eq!(index.path, "content/docs/_index.md");
        assert_eq!(index.title, "Docs");
        assert_eq!(index.page_type, PageType::Section);
        assert_eq!(index.links.len(), 2);
    }

    #[test]
    fn test_repair_leaves_existing_index_and_posts_alone() {
        let mut plan = plan_with(
            SiteType::Blog,
            &[
                "content/_index.md",
                "content/posts/a.md",
                "content/posts/b.md",
                "content/services/_index.md",
                "content/services/x.md",
                "content/services/y.md",
            ],
        );
        let added = PlanValidator::validate_and_repair(&mut plan).unwrap();
        assert!(added.is_empty());
        assert_eq!(plan.pages.len(), 6);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("docs"), "Docs");
        assert_eq!(title_case("getting-started"), "Getting Started");
    }
}
