//! Site planning.
//!
//! This module turns a [`PlanningRequest`] into a validated [`crate::models::Plan`]:
//! - Request validation before any network call
//! - One completion call under the planner's own deadline
//! - Parsing of the nested or flat response shape
//! - Structural validation and section-index repair

pub mod parser;
pub mod planner;
pub mod request;
pub mod validator;

pub use parser::{ParsedPlan, ParsedSite, PlanParser, infer_page_type};
pub use planner::{Planner, PlannerConfig};
pub use request::PlanningRequest;
pub use validator::{AUTO_INDEXED_SECTIONS, PlanValidator};
