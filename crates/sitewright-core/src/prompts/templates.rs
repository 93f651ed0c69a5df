//! Prompt template loading and rendering.
//!
//! Templates are plain text (usually markdown) with `{{KEY}}` placeholders.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder regex should be valid")
});

/// Prompt template errors.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Template file not found.
    #[error("template not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing placeholder value.
    #[error("missing placeholder value: {0}")]
    MissingPlaceholder(String),
}

/// Values substituted into placeholders.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    values: HashMap<String, String>,
}

impl PromptContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a context value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Set a value only when present.
    pub fn set_opt(&mut self, key: impl Into<String>, value: Option<&str>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Get a context value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check if context contains a key.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// A prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    content: String,
    file_path: Option<PathBuf>,
}

impl PromptTemplate {
    /// Load a prompt template from a file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PromptError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PromptError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(Self { content, file_path: Some(path.to_path_buf()) })
    }

    /// Create a template from a string.
    pub fn from_string(content: impl Into<String>) -> Self {
        Self { content: content.into(), file_path: None }
    }

    /// Get the template content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Get the template file path.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Placeholders in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&self.content) {
            let key = caps[1].to_string();
            if !found.contains(&key) {
                found.push(key);
            }
        }
        found
    }

    /// Render, replacing unknown placeholders with an empty string.
    pub fn render(&self, context: &PromptContext) -> String {
        PLACEHOLDER
            .replace_all(&self.content, |caps: &Captures<'_>| context.get(&caps[1]).unwrap_or("").to_string())
            .into_owned()
    }

    /// Render, failing on the first placeholder missing from `context`.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::MissingPlaceholder` naming the key.
    pub fn render_strict(&self, context: &PromptContext) -> Result<String, PromptError> {
        if let Some(missing) = self.placeholders().into_iter().find(|key| !context.contains(key)) {
            return Err(PromptError::MissingPlaceholder(missing));
        }
        Ok(self.render(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_template_load() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Hello {{NAME}}!").unwrap();
        file.flush().unwrap();

        let template = PromptTemplate::load(file.path()).unwrap();
        assert_eq!(template.content(), "Hello {{NAME}}!");
        assert!(template.file_path().is_some());
    }

    #[test]
    fn test_template_load_missing() {
        let result = PromptTemplate::load("/nonexistent/prompt.md");
        assert!(matches!(result, Err(PromptError::NotFound(_))));
    }

    #[test]
    fn test_render_tolerates_spacing_and_repeats() {
        let template = PromptTemplate::from_string("{{ GREETING }} {{NAME}}, {{NAME}}.");
        let mut context = PromptContext::new();
        context.set("GREETING", "Hello");
        context.set("NAME", "Alice");

        assert_eq!(template.render(&context), "Hello Alice, Alice.");
        assert_eq!(template.placeholders(), vec!["GREETING", "NAME"]);
    }

    #[test]
    fn test_missing_placeholder() {
        let template = PromptTemplate::from_string("Hello {{NAME}}!");
        let context = PromptContext::new();

        assert_eq!(template.render(&context), "Hello !");
        assert!(matches!(
            template.render_strict(&context),
            Err(PromptError::MissingPlaceholder(key)) if key == "NAME"
        ));
    }

    #[test]
    fn test_set_opt_skips_none() {
        let mut context = PromptContext::new();
        context.set_opt("TONE", None);
        context.set_opt("AUDIENCE", Some("developers"));
        assert!(!context.contains("TONE"));
        assert_eq!(context.get("AUDIENCE"), Some("developers"));
    }
}
