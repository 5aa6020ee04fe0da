//! Configuration loader and validator for the curation engine.
use crate::prompts::PromptTemplates;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub curation: Curation,
    pub provider: Provider,
    pub storage: Storage,
    #[serde(default)]
    pub prompts: PromptTemplates,
}

/// Image-set and generated-text limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Curation {
    pub max_images: usize,
    /// Optional hard caps on generated text, in characters. Text above the
    /// cap is truncated on a char boundary; absent means no truncation.
    #[serde(default)]
    pub max_chars: MaxChars,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaxChars {
    pub description: Option<usize>,
    pub market_analysis: Option<usize>,
    pub executive_summary: Option<usize>,
}

impl MaxChars {
    pub fn for_kind(&self, kind: crate::model::SlotKind) -> Option<usize> {
        use crate::model::SlotKind;
        match kind {
            SlotKind::Description => self.description,
            SlotKind::MarketAnalysis => self.market_analysis,
            SlotKind::ExecutiveSummary => self.executive_summary,
        }
    }
}

/// Text-generation provider settings (OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Provider {
    pub api_key: String,
    pub model: String,
    /// Override for tests and self-hosted gateways; defaults to the public
    /// endpoint when absent.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Blob-storage settings for committed image binaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Storage {
    pub endpoint: String,
    pub token: String,
    pub bucket: String,
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.curation.max_images == 0 {
        return Err(ConfigError::Invalid("curation.max_images must be > 0"));
    }

    if cfg.provider.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("provider.api_key must be non-empty"));
    }
    if cfg.provider.model.trim().is_empty() {
        return Err(ConfigError::Invalid("provider.model must be non-empty"));
    }

    if cfg.storage.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid("storage.endpoint must be non-empty"));
    }
    if cfg.storage.token.trim().is_empty() {
        return Err(ConfigError::Invalid("storage.token must be non-empty"));
    }
    if cfg.storage.bucket.trim().is_empty() {
        return Err(ConfigError::Invalid("storage.bucket must be non-empty"));
    }

    if cfg.prompts.description.trim().is_empty()
        || cfg.prompts.market_analysis.trim().is_empty()
        || cfg.prompts.executive_summary.trim().is_empty()
    {
        return Err(ConfigError::Invalid("prompts must be non-empty templates"));
    }

    Ok(())
}

/// Example YAML configuration, also used by the test suite.
pub fn example() -> &'static str {
    r#"curation:
  max_images: 10
  max_chars:
    description: null
    market_analysis: null
    executive_summary: null

provider:
  api_key: "YOUR_PROVIDER_API_KEY"
  model: "gpt-3.5-turbo"

storage:
  endpoint: "https://storage.example.com"
  token: "YOUR_STORAGE_TOKEN"
  bucket: "property-images"
"#
}
