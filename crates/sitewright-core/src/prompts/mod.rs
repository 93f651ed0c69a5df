//! Prompt templates and prompt builders.

pub mod builder;
pub mod templates;

pub use builder::{PromptBuilder, PromptPair, PromptTemplates, TemplatePromptBuilder};
pub use templates::{PromptContext, PromptError, PromptTemplate};
