use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::graph::{Direction, NodeIdStrategy};
use crate::render::OutputFormat;

/// Main configuration structure
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub relgraph: RelgraphConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Process-level settings
#[derive(Debug, Clone, Deserialize)]
pub struct RelgraphConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RelgraphConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Diagram compiler options
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub direction: Direction,
    /// Edge labels are cut to this many characters.
    #[serde(default = "default_label_max_chars")]
    pub label_max_chars: usize,
    #[serde(default)]
    pub node_id_strategy: NodeIdStrategy,
    /// Mermaid style applied to focus nodes.
    #[serde(default = "default_highlight_style")]
    pub highlight_style: String,
    /// Used when a group name sanitizes to nothing.
    #[serde(default = "default_group_fallback")]
    pub group_fallback: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            label_max_chars: default_label_max_chars(),
            node_id_strategy: NodeIdStrategy::default(),
            highlight_style: default_highlight_style(),
            group_fallback: default_group_fallback(),
        }
    }
}

/// Kroki renderer settings
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_renderer_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_renderer_timeout_secs")]
    pub timeout_secs: u64,
    /// 0 disables the render cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            base_url: default_renderer_base_url(),
            format: OutputFormat::default(),
            timeout_secs: default_renderer_timeout_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// LLM relation source settings
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_llm_api_base(),
            model: default_llm_model(),
            api_key_env: default_llm_api_key_env(),
            max_retries: default_llm_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Regenerate-compile-render loop settings
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_label_max_chars() -> usize {
    5
}

fn default_highlight_style() -> String {
    "fill:#FFD700,stroke:#FF8C00,stroke-width:4px".to_string()
}

fn default_group_fallback() -> String {
    "group".to_string()
}

fn default_renderer_base_url() -> String {
    "https://kroki.io".to_string()
}

fn default_renderer_timeout_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    64
}

fn default_llm_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_max_retries() -> usize {
    3
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_system_prompt() -> String {
    "Extract the relationships between the characters that matter for the question. \
     Return the central character as center_person and one entry per relationship. \
     Keep each label to five characters or fewer."
        .to_string()
}

fn default_max_attempts() -> usize {
    3
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RELGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = Self::config_path();

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Like [`Config::load`], but falls back to defaults when no config file exists.
    ///
    /// A file that exists but does not parse or validate is still an error.
    pub fn load_or_default() -> Result<Self> {
        if Self::config_path().exists() {
            return Self::load();
        }
        let _ = dotenv::dotenv();
        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    fn config_path() -> PathBuf {
        std::env::var("RELGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.compiler.label_max_chars == 0 {
            anyhow::bail!("compiler.label_max_chars must be greater than 0");
        }

        if self.compiler.group_fallback.trim().is_empty() {
            anyhow::bail!("compiler.group_fallback must not be empty");
        }

        url::Url::parse(&self.renderer.base_url)
            .with_context(|| format!("renderer.base_url is not a valid URL: {}", self.renderer.base_url))?;

        url::Url::parse(&self.llm.api_base)
            .with_context(|| format!("llm.api_base is not a valid URL: {}", self.llm.api_base))?;

        if self.renderer.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than 0");
        }

        if self.pipeline.max_attempts == 0 {
            anyhow::bail!("pipeline.max_attempts must be greater than 0");
        }

        Ok(())
    }

    /// Read the LLM API key from the environment variable named in `[llm]`.
    pub fn llm_api_key(&self) -> Result<String> {
        std::env::var(&self.llm.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with your OpenAI API key.",
                self.llm.api_key_env
            )
        })
    }
}
