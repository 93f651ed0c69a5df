//! Data models for Sitewright.
//!
//! This module contains the plan, page and frontmatter types that flow
//! through planning, generation and persistence.

pub mod frontmatter;
pub mod plan;

pub use frontmatter::{Frontmatter, FrontmatterValue};
pub use plan::{
    CONTENT_ROOT_PREFIX, PLAN_SCHEMA_VERSION, Page, PageStatus, PageType, Plan, PlanStats, PlanStatus,
    ROOT_INDEX_PATHS, SiteType, content_type_for, is_index_file, is_root_index,
};
