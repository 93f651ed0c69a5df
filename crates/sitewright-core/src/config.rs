//! Configuration file support.
//!
//! Configuration precedence:
//! 1. Command-line arguments (applied by the caller)
//! 2. Environment variables (`SITEWRIGHT_PROVIDER`, `SITEWRIGHT_MODEL`)
//! 3. Local config file (`./.sitewright.toml`)
//! 4. Global config file (`~/.sitewright/config.toml`)
//! 5. Defaults

use crate::error::{Result, SitewrightError};
use crate::generation::{FsContentStore, Generator, GeneratorConfig};
use crate::pipeline::{Pipeline, PipelineConfig, PlanStore};
use crate::planning::{Planner, PlannerConfig};
use crate::progress::ProgressObserver;
use crate::prompts::{PromptBuilder, PromptTemplates, TemplatePromptBuilder};
use serde::{Deserialize, Serialize};
use sitewright_abstraction::CompletionClient;
use sitewright_models::{ClientConfig, ClientFactory, ProviderKind, RetryPolicy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the provider kind.
pub const ENV_PROVIDER: &str = "SITEWRIGHT_PROVIDER";

/// Environment variable overriding the model id.
pub const ENV_MODEL: &str = "SITEWRIGHT_MODEL";

const DEFAULT_PROVIDER: &str = "claude";

/// Completion provider settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// `claude`, `openai` or `mock`.
    pub kind: Option<String>,
    /// Model id; defaults per provider.
    pub model: Option<String>,
    /// API key; falls back to the provider's environment variable.
    pub api_key: Option<String>,
    /// API root override.
    pub base_url: Option<String>,
    /// HTTP timeout for one request.
    pub request_timeout_secs: Option<u64>,
    /// Client-level retries of transient failures.
    pub max_retries: Option<u32>,
}

/// Page generation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    /// Site root the content paths are written under.
    pub content_root: Option<PathBuf>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub page_timeout_secs: Option<u64>,
    pub overwrite_existing: Option<bool>,
    pub continue_on_error: Option<bool>,
    pub dry_run: Option<bool>,
}

/// Planning settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningSection {
    pub plan_timeout_secs: Option<u64>,
    /// Where the plan document is persisted.
    pub plan_path: Option<PathBuf>,
    /// Directory with prompt template overrides.
    pub template_dir: Option<PathBuf>,
}

/// Whole-run settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Deadline for a whole run; zero or absent means none.
    pub run_timeout_secs: Option<u64>,
}

/// Sitewright configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitewrightConfig {
    pub provider: ProviderSection,
    pub generation: GenerationSection,
    pub planning: PlanningSection,
    pub pipeline: PipelineSection,
}

fn overlay<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

impl SitewrightConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Config` when the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SitewrightError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| SitewrightError::Config(format!("{}: {e}", path.display())))
    }

    /// Writes configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Config` on serialization failure, or `Io`.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SitewrightError::Config(format!("Failed to serialize: {e}")))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `~/.sitewright/config.toml`.
    pub fn default_global_path() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".sitewright").join("config.toml")
    }

    /// `./.sitewright.toml`.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".sitewright.toml")
    }

    /// Loads the global then the local config file, then applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns `Config` when a file exists but cannot be parsed.
    pub fn discover_and_load() -> Result<Self> {
        let mut config = Self::discover_from(&Self::default_global_path(), &Self::default_local_path())?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Loads `global` then `local`; missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Config` when a file exists but cannot be parsed.
    pub fn discover_from(global: &Path, local: &Path) -> Result<Self> {
        let mut config = Self::default();
        for path in [global, local] {
            if path.is_file() {
                debug!(path = %path.display(), "Loading configuration");
                config.merge(&Self::load_from_file(path)?);
            }
        }
        Ok(config)
    }

    /// Applies `SITEWRIGHT_PROVIDER` and `SITEWRIGHT_MODEL` through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(kind) = lookup(ENV_PROVIDER).filter(|v| !v.trim().is_empty()) {
            self.provider.kind = Some(kind);
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.provider.model = Some(model);
        }
    }

    /// Merges `other` into `self`; values set in `other` win.
    pub fn merge(&mut self, other: &Self) {
        let (p, o) = (&mut self.provider, &other.provider);
        overlay(&mut p.kind, &o.kind);
        overlay(&mut p.model, &o.model);
        overlay(&mut p.api_key, &o.api_key);
        overlay(&mut p.base_url, &o.base_url);
        overlay(&mut p.request_timeout_secs, &o.request_timeout_secs);
        overlay(&mut p.max_retries, &o.max_retries);

        let (g, o) = (&mut self.generation, &other.generation);
        overlay(&mut g.content_root, &o.content_root);
        overlay(&mut g.max_attempts, &o.max_attempts);
        overlay(&mut g.base_delay_ms, &o.base_delay_ms);
        overlay(&mut g.backoff_multiplier, &o.backoff_multiplier);
        overlay(&mut g.page_timeout_secs, &o.page_timeout_secs);
        overlay(&mut g.overwrite_existing, &o.overwrite_existing);
        overlay(&mut g.continue_on_error, &o.continue_on_error);
        overlay(&mut g.dry_run, &o.dry_run);

        overlay(&mut self.planning.plan_timeout_secs, &other.planning.plan_timeout_secs);
        overlay(&mut self.planning.plan_path, &other.planning.plan_path);
        overlay(&mut self.planning.template_dir, &other.planning.template_dir);

        overlay(&mut self.pipeline.run_timeout_secs, &other.pipeline.run_timeout_secs);
    }

    /// The configured provider kind.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unrecognized provider.
    pub fn provider_kind(&self) -> Result<ProviderKind> {
        self.provider
            .kind
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER)
            .parse::<ProviderKind>()
            .map_err(|e| SitewrightError::Config(format!("provider.kind: {e}")))
    }

    /// Completion client settings.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unrecognized provider.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let provider = self.provider_kind()?;
        let model = self.provider.model.clone().unwrap_or_else(|| default_model(provider).to_string());
        let mut config = ClientConfig::new(provider, model);
        if let Some(key) = &self.provider.api_key {
            config = config.with_api_key(key.clone());
        }
        if let Some(url) = &self.provider.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(secs) = self.provider.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(max_retries) = self.provider.max_retries {
            config.retry = RetryPolicy { max_retries, ..RetryPolicy::default() };
        }
        Ok(config)
    }

    /// Planner settings.
    pub fn planner_config(&self) -> PlannerConfig {
        let mut config = PlannerConfig::default();
        if let Some(secs) = self.planning.plan_timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Generator settings.
    pub fn generator_config(&self) -> GeneratorConfig {
        let defaults = GeneratorConfig::default();
        let g = &self.generation;
        GeneratorConfig {
            max_attempts: g.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            base_delay: g.base_delay_ms.map_or(defaults.base_delay, Duration::from_millis),
            backoff_multiplier: g.backoff_multiplier.unwrap_or(defaults.backoff_multiplier),
            attempt_timeout: g.page_timeout_secs.map_or(defaults.attempt_timeout, Duration::from_secs),
            overwrite_existing: g.overwrite_existing.unwrap_or(defaults.overwrite_existing),
            dry_run: g.dry_run.unwrap_or(defaults.dry_run),
        }
    }

    /// Pipeline settings.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            plan_path: self.planning.plan_path.clone().unwrap_or_else(PlanStore::default_path),
            continue_on_error: self.generation.continue_on_error.unwrap_or(true),
            run_timeout: self.pipeline.run_timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
        }
    }

    /// Site root pages are written under.
    pub fn content_root(&self) -> PathBuf {
        self.generation.content_root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Prompt builder using the configured template directory, if any.
    ///
    /// # Errors
    ///
    /// Returns `Prompt` when a template file cannot be read.
    pub fn prompt_builder(&self) -> Result<Arc<dyn PromptBuilder>> {
        let templates = match &self.planning.template_dir {
            Some(dir) => PromptTemplates::load_dir(dir)?,
            None => PromptTemplates::default(),
        };
        Ok(Arc::new(TemplatePromptBuilder::new(templates)))
    }

    /// Creates the configured completion client.
    ///
    /// # Errors
    ///
    /// Returns `ClientNotConfigured` when credentials are missing, or
    /// `Config` for an unrecognized provider.
    pub fn build_client(&self) -> Result<Arc<dyn CompletionClient>> {
        let config = self.client_config()?;
        Ok(ClientFactory::create(&config)?)
    }

    /// Assembles a pipeline around `client`, reporting to `observer`.
    ///
    /// # Errors
    ///
    /// Returns `Prompt` when template overrides cannot be loaded.
    pub fn build_pipeline(&self, client: Arc<dyn CompletionClient>, observer: ProgressObserver) -> Result<Pipeline> {
        let prompts = self.prompt_builder()?;
        let planner = Planner::new(Arc::clone(&client), Arc::clone(&prompts), self.planner_config())
            .with_observer(Arc::clone(&observer));
        let generator = Generator::new(
            client,
            prompts,
            Arc::new(FsContentStore::new(self.content_root())),
            self.generator_config(),
        )
        .with_observer(Arc::clone(&observer));
        Ok(Pipeline::new(planner, generator, self.pipeline_config()).with_observer(observer))
    }
}

fn default_model(provider: ProviderKind) -> &'static str {
    match provider {
        ProviderKind::Claude => "claude-sonnet-4-5-20250929",
        ProviderKind::OpenAI => "gpt-4o",
        ProviderKind::Mock => "mock",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[provider]
kind = "openai"
model = "gpt-4o-mini"
base_url = "http://localhost:8080/v1"
max_retries = 0

[generation]
content_root = "site"
max_attempts = 5
base_delay_ms = 250
backoff_multiplier = 1.5
continue_on_error = false

[planning]
plan_timeout_secs = 30

[pipeline]
run_timeout_secs = 600
"#,
        )
        .unwrap();

        let config = SitewrightConfig::load_from_file(&path).unwrap();
        let client = config.client_config().unwrap();
        assert_eq!(client.provider, ProviderKind::OpenAI);
        assert_eq!(client.model_id, "gpt-4o-mini");
        assert_eq!(client.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(client.retry.max_retries, 0);

        let generator = config.generator_config();
        assert_eq!(generator.max_attempts, 5);
        assert_eq!(generator.base_delay, Duration::from_millis(250));
        assert!((generator.backoff_multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(generator.attempt_timeout, GeneratorConfig::default().attempt_timeout);

        assert_eq!(config.planner_config().timeout, Duration::from_secs(30));
        let pipeline = config.pipeline_config();
        assert!(!pipeline.continue_on_error);
        assert_eq!(pipeline.run_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.content_root(), PathBuf::from("site"));
    }

    #[test]
    fn test_defaults() {
        let config = SitewrightConfig::default();
        let client = config.client_config().unwrap();
        assert_eq!(client.provider, ProviderKind::Claude);
        assert_eq!(client.model_id, "claude-sonnet-4-5-20250929");
        assert_eq!(config.generator_config().max_attempts, 3);
        let pipeline = config.pipeline_config();
        assert!(pipeline.continue_on_error);
        assert!(pipeline.run_timeout.is_none());
        assert!(pipeline.plan_path.ends_with(".sitewright/plan.json"));
    }

    #[test]
    fn test_local_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let local = temp_dir.path().join("local.toml");
        std::fs::write(&global, "[provider]\nkind = \"claude\"\nmodel = \"global-model\"\n\n[generation]\ndry_run = true\n")
            .unwrap();
        std::fs::write(&local, "[provider]\nmodel = \"local-model\"\n").unwrap();

        let config = SitewrightConfig::discover_from(&global, &local).unwrap();
        assert_eq!(config.provider.kind.as_deref(), Some("claude"));
        assert_eq!(config.provider.model.as_deref(), Some("local-model"));
        assert_eq!(config.generation.dry_run, Some(true));
    }

    #[test]
    fn test_missing_files_are_skipped_but_garbage_is_not() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        assert_eq!(SitewrightConfig::discover_from(&missing, &missing).unwrap(), SitewrightConfig::default());

        let broken = temp_dir.path().join("broken.toml");
        std::fs::write(&broken, "[provider\nkind =").unwrap();
        assert!(matches!(SitewrightConfig::discover_from(&missing, &broken), Err(SitewrightError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SitewrightConfig::default();
        config.provider.model = Some("file-model".to_string());
        config.apply_env(|name| match name {
            ENV_PROVIDER => Some("mock".to_string()),
            ENV_MODEL => Some(" ".to_string()),
            _ => None,
        });
        assert_eq!(config.provider_kind().unwrap(), ProviderKind::Mock);
        assert_eq!(config.provider.model.as_deref(), Some("file-model"));
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let mut config = SitewrightConfig::default();
        config.provider.kind = Some("carrier-pigeon".to_string());
        assert!(matches!(config.build_client(), Err(SitewrightError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/config.toml");
        let mut config = SitewrightConfig::default();
        config.provider.kind = Some("mock".to_string());
        config.pipeline.run_timeout_secs = Some(0);
        config.save_to_file(&path).unwrap();

        let loaded = SitewrightConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.pipeline_config().run_timeout.is_none());
    }

    #[tokio::test]
    async fn test_build_pipeline_with_mock_provider() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = SitewrightConfig::default();
        config.provider.kind = Some("mock".to_string());
        config.planning.plan_path = Some(temp_dir.path().join("plan.json"));
        config.generation.content_root = Some(temp_dir.path().join("site"));

        let client = config.build_client().unwrap();
        let pipeline = config.build_pipeline(client, crate::progress::noop()).unwrap();
        assert_eq!(pipeline.store().path(), temp_dir.path().join("plan.json"));
        assert!(pipeline.status().unwrap().is_none());
    }
}
