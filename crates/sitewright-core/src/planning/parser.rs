//! Parser for converting completion text into a structured plan.
//!
//! Two shapes are accepted. The expected one nests site metadata:
//!
//! ```json
//! { "site": { "name": "...", "type": "blog", ... }, "pages": [ ... ] }
//! ```
//!
//! The fallback is flat:
//!
//! ```json
//! { "site_name": "...", "site_type": "blog", "description": "...", "pages": [ ... ] }
//! ```

use crate::error::{Result, SitewrightError};
use crate::markup::{excerpt, strip_code_fences};
use crate::models::{Frontmatter, Page, PageType, is_index_file, is_root_index};
use serde::Deserialize;
use std::collections::HashSet;

/// Site metadata found in the response. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSite {
    /// Site name.
    pub name: Option<String>,
    /// Site type tag, unvalidated.
    pub site_type: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Audience.
    pub audience: Option<String>,
    /// Tone.
    pub tone: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Theme.
    pub theme: Option<String>,
}

/// A parsed plan, before it is merged with the request and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPlan {
    /// Site metadata.
    pub site: ParsedSite,
    /// Pages in response order, with ids and types resolved.
    pub pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct NestedDocument {
    site: RawSite,
    #[serde(default)]
    pages: Vec<RawPage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSite {
    #[serde(default, alias = "site_name", alias = "title")]
    name: Option<String>,
    #[serde(default, rename = "type", alias = "site_type")]
    site_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    audience: Option<String>,
    #[serde(default)]
    tone: Option<String>,
    #[serde(default, alias = "baseURL", alias = "baseUrl")]
    base_url: Option<String>,
    #[serde(default)]
    theme: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlatDocument {
    #[serde(default, alias = "siteName", alias = "name")]
    site_name: Option<String>,
    #[serde(default, alias = "siteType", alias = "type")]
    site_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    path: String,
    #[serde(default, rename = "type", alias = "page_type", alias = "pageType")]
    page_type: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    frontmatter: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    outline: Vec<String>,
    #[serde(default)]
    links: Vec<String>,
}

/// Parser for completion responses.
pub struct PlanParser;

impl PlanParser {
    /// Parses `response` into a [`ParsedPlan`].
    ///
    /// # Errors
    ///
    /// Returns `Parse` with a bounded excerpt of the (fence-stripped) text when
    /// neither shape matches.
    pub fn parse(response: &str) -> Result<ParsedPlan> {
        let text = strip_code_fences(response);

        let (site, raw_pages) = match serde_json::from_str::<NestedDocument>(text) {
            Ok(doc) => (
                ParsedSite {
                    name: doc.site.name,
                    site_type: doc.site.site_type,
                    description: doc.site.description,
                    audience: doc.site.audience,
                    tone: doc.site.tone,
                    base_url: doc.site.base_url,
                    theme: doc.site.theme,
                },
                doc.pages,
            ),
            Err(nested_err) => match serde_json::from_str::<FlatDocument>(text) {
                Ok(doc) => (
                    ParsedSite {
                        name: doc.site_name,
                        site_type: doc.site_type,
                        description: doc.description,
                        ..ParsedSite::default()
                    },
                    doc.pages,
                ),
                Err(flat_err) => {
                    return Err(SitewrightError::Parse {
                        message: format!("not a site plan ({nested_err}; flat form: {flat_err})"),
                        excerpt: excerpt(text),
                    });
                }
            },
        };

        Ok(ParsedPlan { site, pages: Self::build_pages(raw_pages) })
    }

    fn build_pages(raw_pages: Vec<RawPage>) -> Vec<Page> {
        let mut seen_ids = HashSet::new();
        raw_pages
            .into_iter()
            .map(|raw| {
                let path = raw.path.trim().trim_start_matches('/').to_string();
                let page_type = infer_page_type(raw.page_type.as_deref(), &path);
                let base_id = raw
                    .id
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| id_from_path(&path));
                let id = unique_id(&base_id, &mut seen_ids);

                let mut page = Page::new(id, path, raw.title.trim(), page_type);
                page.description = raw.description.trim().to_string();
                page.frontmatter = raw.frontmatter.as_ref().map(Frontmatter::from_json_object).unwrap_or_default();
                page.outline = raw.outline;
                page.links = raw.links;
                page
            })
            .collect()
    }
}

/// Resolves a page type from its explicit tag, falling back to its path.
///
/// Path rules, in order: the root index is `home`, any other index file is
/// `section`, a `posts`/`blog` segment means `post`, a `docs` segment means
/// `docs`, anything else is `page`.
pub fn infer_page_type(explicit: Option<&str>, path: &str) -> PageType {
    if let Some(page_type) = explicit.and_then(PageType::parse) {
        return page_type;
    }
    if is_root_index(path) {
        return PageType::Home;
    }
    if is_index_file(path) {
        return PageType::Section;
    }
    let lower = path.to_lowercase();
    let segments: Vec<&str> = lower.split('/').collect();
    let dirs = &segments[..segments.len().saturating_sub(1)];
    if dirs.iter().any(|s| *s == "posts" || *s == "blog") {
        PageType::Post
    } else if dirs.contains(&"docs") {
        PageType::Docs
    } else {
        PageType::Page
    }
}

/// Derives an id from a path: `content/posts/first.md` → `posts-first`.
pub fn id_from_path(path: &str) -> String {
    if is_root_index(path) {
        return "home".to_string();
    }
    let trimmed = path.strip_prefix("content/").unwrap_or(path);
    let trimmed = trimmed.strip_suffix(".md").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("/_index").unwrap_or(trimmed);
    let slug: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
    if slug.is_empty() { "page".to_string() } else { slug }
}

fn unique_id(base: &str, seen: &mut HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut n = 2;
    while !seen.insert(candidate.clone()) {
        candidate = format!("{base}-{n}");
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"```json
{
  "site": {"name": "My Blog", "type": "blog", "description": "tech blog", "tone": "casual"},
  "pages": [
    {"id": "home", "path": "content/_index.md", "type": "home", "title": "Home"},
    {"path": "content/posts/hello-world.md", "title": "Hello World",
     "frontmatter": {"tags": ["intro"], "draft": false, "weight": 2}},
    {"path": "/content/about.md", "type": "PAGE", "title": "About", "outline": ["Who", "Why"]}
  ]
}
```"#;

    #[test]
    fn test_parse_nested_shape() {
        let plan = PlanParser::parse(NESTED).unwrap();
        assert_eq!(plan.site.name.as_deref(), Some("My Blog"));
        assert_eq!(plan.site.tone.as_deref(), Some("casual"));
        assert_eq!(plan.pages.len(), 3);

        let post = &plan.pages[1];
        assert_eq!(post.id, "posts-hello-world");
        assert_eq!(post.page_type, PageType::Post);
        assert_eq!(post.content_type, "posts");
        let keys: Vec<&str> = post.frontmatter.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["tags", "draft", "weight"]);

        let about = &plan.pages[2];
        assert_eq!(about.path, "content/about.md");
        assert_eq!(about.page_type, PageType::Page);
        assert_eq!(about.outline, vec!["Who", "Why"]);
    }

    #[test]
    fn test_parse_flat_fallback() {
        let flat = r#"{"site_name": "Docs", "site_type": "docs", "description": "d",
            "pages": [{"path": "content/_index.md", "title": "Home"}]}"#;
        let plan = PlanParser::parse(flat).unwrap();
        assert_eq!(plan.site.name.as_deref(), Some("Docs"));
        assert_eq!(plan.site.site_type.as_deref(), Some("docs"));
        assert_eq!(plan.pages[0].id, "home");
        assert_eq!(plan.pages[0].page_type, PageType::Home);
    }

    #[test]
    fn test_parse_error_carries_bounded_excerpt() {
        let junk = format!("Sure! Here is your plan: {}", "blah ".repeat(100));
        let err = PlanParser::parse(&junk).unwrap_err();
        match err {
            SitewrightError::Parse { excerpt, message } => {
                assert!(excerpt.starts_with("Sure! Here is your plan"));
                assert!(excerpt.ends_with("..."));
                assert!(excerpt.chars().count() <= 200);
                assert!(!message.is_empty());
            }
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_infer_page_type() {
        assert_eq!(infer_page_type(Some("Docs"), "content/x.md"), PageType::Docs);
        assert_eq!(infer_page_type(Some("unknown"), "content/index.md"), PageType::Home);
        assert_eq!(infer_page_type(None, "content/guides/_index.md"), PageType::Section);
        assert_eq!(infer_page_type(None, "content/blog/2024/post.md"), PageType::Post);
        assert_eq!(infer_page_type(None, "content/docs/install.md"), PageType::Docs);
        assert_eq!(infer_page_type(None, "content/contact.md"), PageType::Page);
        assert_eq!(infer_page_type(None, "content/posts.md"), PageType::Page);
    }

    #[test]
    fn test_duplicate_ids_are_suffixed() {
        let text = r#"{"site": {}, "pages": [
            {"id": "a", "path": "content/a.md"},
            {"id": "a", "path": "content/b.md"},
            {"path": "content/guides/_index.md"}
        ]}"#;
        let plan = PlanParser::parse(text).unwrap();
        let ids: Vec<&str> = plan.pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a-2", "guides"]);
    }
}
