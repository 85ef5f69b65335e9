use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};
use log::warn;

/// Main configuration structure for aiwi
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Language model settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Shopping search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Pipeline execution settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature setting
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on reply length
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Shopping search endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum in-flight collaborator calls per stage
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

// Default value functions
fn default_model() -> String { "gemini-1.5-flash".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> usize { 2048 }
fn default_llm_timeout() -> u64 { 60 }
fn default_endpoint() -> String { "https://openapi.naver.com/v1/search/shop.json".to_string() }
fn default_search_timeout() -> u64 { 10 }
fn default_concurrency() -> usize { 4 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { concurrency: default_concurrency() }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            let expanded_path = shellexpand::tilde(path);
            return Self::from_file(expanded_path.as_ref());
        }

        let default_paths = vec![
            "aiwi.toml",
            ".aiwi.toml",
            "~/.config/aiwi/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return Ok(config),
                    Err(e) => warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Fan-out width, never below one.
    pub fn concurrency(&self) -> usize {
        self.pipeline.concurrency.max(1)
    }
}
