//! Prompt construction for planning and page generation.
//!
//! The orchestration code only sees the [`PromptBuilder`] trait. The default
//! [`TemplatePromptBuilder`] renders a [`PromptTemplates`] bundle, which ships
//! with built-in wording and can be overridden file by file.

use super::templates::{PromptContext, PromptError, PromptTemplate};
use crate::models::{Page, Plan, SiteType};
use crate::planning::PlanningRequest;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// System and user prompt for one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    /// System prompt.
    pub system: String,
    /// User prompt.
    pub user: String,
}

/// Builds the prompts sent to the completion service.
pub trait PromptBuilder: Send + Sync {
    /// Prompts for the planning call.
    ///
    /// # Errors
    ///
    /// Returns an error if a template cannot be rendered.
    fn plan_prompts(&self, request: &PlanningRequest) -> Result<PromptPair, PromptError>;

    /// Prompts for generating `page` of `plan`.
    ///
    /// # Errors
    ///
    /// Returns an error if a template cannot be rendered.
    fn page_prompts(&self, plan: &Plan, page: &Page) -> Result<PromptPair, PromptError>;
}

const PLAN_SYSTEM: &str = r#"You are a website content strategist. You plan the pages of a static site.

Respond with a single JSON object and nothing else, using this structure:

{
  "site": {
    "name": "Site name",
    "type": "blog | docs | portfolio | business | landing",
    "description": "One sentence about the site",
    "audience": "Who reads it",
    "tone": "Writing tone",
    "base_url": "https://example.com/",
    "theme": "theme name"
  },
  "pages": [
    {
      "id": "unique-kebab-case-id",
      "path": "content/...md",
      "type": "home | post | section | docs | page",
      "title": "Page title",
      "description": "What the page covers",
      "frontmatter": { "tags": ["..."] },
      "outline": ["Heading or key point", "..."],
      "links": ["content/other-page.md"]
    }
  ]
}

Rules:
- Every path starts with "content/" and is unique.
- Exactly one home page, at "content/_index.md".
- A section with several pages gets its own "_index.md".
- Plan at least {{MIN_PAGES}} pages for a {{SITE_TYPE}} site.
"#;

const PLAN_USER: &str = r"Plan a {{SITE_TYPE}} site.

Site name: {{SITE_NAME}}
Description: {{DESCRIPTION}}
Audience: {{AUDIENCE}}
Tone: {{TONE}}
Base URL: {{BASE_URL}}
Theme: {{THEME}}

Existing content (keep these paths, do not plan duplicates):
{{EXISTING_PAGES}}

Theme notes:
{{THEME_NOTES}}
";

const PAGE_SYSTEM: &str = r"You write content pages for static sites.

Respond with the complete markdown file and nothing else: YAML frontmatter
between --- lines, then the body. Always set draft: false. Do not wrap the
answer in code fences. Link to other pages only through the paths you are
given.
";

const PAGE_USER: &str = r"Write the page {{PAGE_PATH}} for the {{SITE_TYPE}} site {{SITE_NAME}}.

Site description: {{SITE_DESCRIPTION}}
Audience: {{AUDIENCE}}
Tone: {{TONE}}

Page title: {{PAGE_TITLE}}
Page type: {{PAGE_TYPE}}
Page description: {{PAGE_DESCRIPTION}}

Frontmatter fields:
{{FRONTMATTER}}

Outline:
{{OUTLINE}}

Link targets:
{{LINKS}}

Other pages on the site:
{{SITE_PAGES}}

Theme notes:
{{THEME_NOTES}}
";

/// The four templates used for planning and page generation.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    /// Planning system prompt.
    pub plan_system: PromptTemplate,
    /// Planning user prompt.
    pub plan_user: PromptTemplate,
    /// Page system prompt.
    pub page_system: PromptTemplate,
    /// Page user prompt.
    pub page_user: PromptTemplate,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            plan_system: PromptTemplate::from_string(PLAN_SYSTEM),
            plan_user: PromptTemplate::from_string(PLAN_USER),
            page_system: PromptTemplate::from_string(PAGE_SYSTEM),
            page_user: PromptTemplate::from_string(PAGE_USER),
        }
    }
}

impl PromptTemplates {
    /// File names looked up by [`PromptTemplates::load_dir`].
    pub const FILE_NAMES: [&'static str; 4] = ["plan_system.md", "plan_user.md", "page_system.md", "page_user.md"];

    /// Built-in templates, overridden by whichever of [`Self::FILE_NAMES`]
    /// exist in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing override cannot be read.
    pub fn load_dir(dir: &Path) -> Result<Self, PromptError> {
        let mut templates = Self::default();
        let slots = [
            &mut templates.plan_system,
            &mut templates.plan_user,
            &mut templates.page_system,
            &mut templates.page_user,
        ];
        for (slot, name) in slots.into_iter().zip(Self::FILE_NAMES) {
            let path = dir.join(name);
            if path.is_file() {
                debug!(path = %path.display(), "Loading prompt template override");
                *slot = PromptTemplate::load(&path)?;
            }
        }
        Ok(templates)
    }
}

/// [`PromptBuilder`] backed by [`PromptTemplates`].
#[derive(Debug, Clone, Default)]
pub struct TemplatePromptBuilder {
    templates: PromptTemplates,
    theme_notes: Option<String>,
}

impl TemplatePromptBuilder {
    /// Creates a builder over `templates`.
    pub fn new(templates: PromptTemplates) -> Self {
        Self { templates, theme_notes: None }
    }

    /// Theme notes included in page prompts.
    #[must_use]
    pub fn with_theme_notes(mut self, notes: impl Into<String>) -> Self {
        self.theme_notes = Some(notes.into());
        self
    }

    fn render(template: &PromptTemplate, context: &PromptContext) -> String {
        template.render(context).trim().to_string()
    }
}

fn bullet_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    if out.is_empty() {
        out.push_str("(none)");
    }
    out.trim_end().to_string()
}

fn or_unspecified(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("(unspecified)")
}

impl PromptBuilder for TemplatePromptBuilder {
    fn plan_prompts(&self, request: &PlanningRequest) -> Result<PromptPair, PromptError> {
        let site_type = request.site_type.trim().to_lowercase();
        let min_pages = site_type.parse::<SiteType>().map_or(1, SiteType::min_pages);

        let mut context = PromptContext::new();
        context.set("SITE_NAME", request.site_name.trim());
        context.set("SITE_TYPE", site_type);
        context.set("MIN_PAGES", min_pages.to_string());
        context.set("DESCRIPTION", request.description.trim());
        context.set("AUDIENCE", or_unspecified(request.audience.as_deref()));
        context.set("TONE", or_unspecified(request.tone.as_deref()));
        context.set("BASE_URL", or_unspecified(request.base_url.as_deref()));
        context.set("THEME", or_unspecified(request.theme.as_deref()));
        context.set("EXISTING_PAGES", bullet_list(request.existing_pages.iter().map(String::as_str)));
        context.set(
            "THEME_NOTES",
            or_unspecified(request.theme_notes.as_deref().or(self.theme_notes.as_deref())),
        );

        Ok(PromptPair {
            system: Self::render(&self.templates.plan_system, &context),
            user: Self::render(&self.templates.plan_user, &context),
        })
    }

    fn page_prompts(&self, plan: &Plan, page: &Page) -> Result<PromptPair, PromptError> {
        let mut context = PromptContext::new();
        context.set("SITE_NAME", plan.site_name.as_str());
        context.set("SITE_TYPE", plan.site_type.as_str());
        context.set("SITE_DESCRIPTION", plan.description.as_str());
        context.set("AUDIENCE", or_unspecified(plan.audience.as_deref()));
        context.set("TONE", or_unspecified(plan.tone.as_deref()));
        context.set("PAGE_PATH", page.path.as_str());
        context.set("PAGE_TITLE", page.title.as_str());
        context.set("PAGE_TYPE", page.page_type.as_str());
        context.set("PAGE_DESCRIPTION", or_unspecified(Some(page.description.as_str())));

        let frontmatter: Vec<String> = page.frontmatter.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        context.set("FRONTMATTER", bullet_list(frontmatter.iter().map(String::as_str)));
        context.set("OUTLINE", bullet_list(page.outline.iter().map(String::as_str)));
        context.set("LINKS", bullet_list(page.links.iter().map(String::as_str)));

        let others: Vec<String> = plan
            .pages
            .iter()
            .filter(|p| p.id != page.id)
            .map(|p| format!("{} ({})", p.path, p.title))
            .collect();
        context.set("SITE_PAGES", bullet_list(others.iter().map(String::as_str)));
        context.set("THEME_NOTES", or_unspecified(self.theme_notes.as_deref()));

        Ok(PromptPair {
            system: Self::render(&self.templates.page_system, &context),
            user: Self::render(&self.templates.page_user, &context),
        })
    }
}
