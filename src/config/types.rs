//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (`$XDG_CONFIG_HOME/ragweave/`) and project (`.ragweave/`)
//! level configuration.

use serde::{Deserialize, Serialize};

use crate::ai::{Pricing, ProviderConfig};
use crate::analyzer::scanner::{DEFAULT_EXCLUDE, DEFAULT_MAX_FILE_SIZE};
use crate::constants::{network, pricing, retrieval, retry};
use crate::types::{RagError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Workspace enumeration
    pub scan: ScanConfig,

    /// Codebase document settings
    pub code: CodeConfig,

    /// Query-tool hand-off
    pub retrieval: RetrievalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            scan: ScanConfig::default(),
            code: CodeConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.llm.provider.as_str(), "openai" | "ollama") {
            return Err(RagError::Config(format!(
                "Unknown LLM provider '{}'. Supported: openai, ollama",
                self.llm.provider
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(RagError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(RagError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.summary_model.trim().is_empty() || self.llm.guide_model.trim().is_empty() {
            return Err(RagError::Config(
                "LLM summary_model and guide_model must not be empty".to_string(),
            ));
        }

        let prices = [
            self.llm.input_price_per_million,
            self.llm.output_price_per_million,
            self.llm.summary_input_price_per_million,
            self.llm.summary_output_price_per_million,
        ];
        if prices.iter().any(|price| *price < 0.0) {
            return Err(RagError::Config(
                "LLM prices must not be negative".to_string(),
            ));
        }

        if self.retrieval.similarity_top_k == 0 {
            return Err(RagError::Config(
                "retrieval.similarity_top_k must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai" or "ollama"
    pub provider: String,

    /// Model for file and directory summaries
    pub summary_model: String,

    /// Model for dependency usage guides
    pub guide_model: String,

    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Custom endpoint (OpenAI-compatible base URL or Ollama host)
    pub api_base: Option<String>,

    /// API key; falls back to OPENAI_API_KEY. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Retries for rate-limit, network and transient failures (0 disables)
    pub max_retries: usize,

    /// USD per million input tokens of `guide_model`, for usage estimates
    pub input_price_per_million: f64,

    /// USD per million output tokens of `guide_model`, for usage estimates
    pub output_price_per_million: f64,

    /// USD per million input tokens of `summary_model`
    pub summary_input_price_per_million: f64,

    /// USD per million output tokens of `summary_model`
    pub summary_output_price_per_million: f64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("summary_model", &self.summary_model)
            .field("guide_model", &self.guide_model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            summary_model: "gpt-3.5-turbo".to_string(),
            guide_model: "gpt-4o".to_string(),
            temperature: 0.2,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            api_base: None,
            api_key: None,
            max_retries: retry::DEFAULT_MAX_RETRIES,
            input_price_per_million: pricing::INPUT_PER_MILLION,
            output_price_per_million: pricing::OUTPUT_PER_MILLION,
            summary_input_price_per_million: pricing::SUMMARY_INPUT_PER_MILLION,
            summary_output_price_per_million: pricing::SUMMARY_OUTPUT_PER_MILLION,
        }
    }
}

impl LlmConfig {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider.clone(),
            timeout_secs: self.timeout_secs,
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            max_retries: self.max_retries,
        }
    }

    /// Rates for `guide_model` calls
    pub fn guide_pricing(&self) -> Pricing {
        Pricing {
            input_per_million: self.input_price_per_million,
            output_per_million: self.output_price_per_million,
        }
    }

    /// Rates for `summary_model` calls
    pub fn summary_pricing(&self) -> Pricing {
        Pricing {
            input_per_million: self.summary_input_price_per_million,
            output_per_million: self.summary_output_price_per_million,
        }
    }
}

// =============================================================================
// Scan Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Workspace-relative globs to skip (on top of .gitignore)
    pub exclude: Vec<String>,

    /// Files larger than this (bytes) are not summarized
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

// =============================================================================
// Code Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    pub tagging: TaggingMode,
}

/// How codebase documents are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaggingMode {
    /// File and directory summaries, aggregated bottom-up
    #[default]
    Tree,
    /// One summary per file, tagged `code` or `doc` by extension
    Flat,
}

impl std::fmt::Display for TaggingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaggingMode::Tree => write!(f, "tree"),
            TaggingMode::Flat => write!(f, "flat"),
        }
    }
}

impl std::str::FromStr for TaggingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tree" => Ok(TaggingMode::Tree),
            "flat" => Ok(TaggingMode::Flat),
            _ => Err(format!(
                "Unknown tagging mode: {}. Valid values: tree, flat",
                s
            )),
        }
    }
}

// =============================================================================
// Retrieval Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub similarity_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_top_k: retrieval::DEFAULT_SIMILARITY_TOP_K,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.summary_model, "gpt-3.5-turbo");
        assert_eq!(config.llm.guide_model, "gpt-4o");
        assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.code.tagging, TaggingMode::Tree);
        assert_eq!(config.retrieval.similarity_top_k, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tagging_mode() {
        assert_eq!(TaggingMode::Flat.to_string(), "flat");
        assert_eq!("TREE".parse::<TaggingMode>().unwrap(), TaggingMode::Tree);
        assert!("bushy".parse::<TaggingMode>().is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.provider = "claude-code".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retrieval.similarity_top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_never_serialized_or_debugged() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-live-123".to_string());

        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("sk-live-123"));
        assert!(!format!("{:?}", config).contains("sk-live-123"));
    }

    #[test]
    fn test_provider_config_and_pricing() {
        let mut config = Config::default();
        config.llm.provider = "ollama".to_string();
        config.llm.max_retries = 0;
        config.llm.input_price_per_million = 1.0;

        let provider = config.llm.provider_config();
        assert_eq!(provider.provider, "ollama");
        assert_eq!(provider.max_retries, 0);
        assert_eq!(config.llm.guide_pricing().input_per_million, 1.0);
    }

    #[test]
    fn test_summary_model_has_its_own_rates() {
        let llm = LlmConfig::default();

        assert_eq!(llm.guide_pricing().input_per_million, 5.0);
        assert_eq!(llm.guide_pricing().output_per_million, 15.0);
        assert_eq!(llm.summary_pricing().input_per_million, 0.5);
        assert_eq!(llm.summary_pricing().output_per_million, 1.5);

        let mut config = Config::default();
        config.llm.summary_output_price_per_million = -1.0;
        assert!(config.validate().is_err());
    }
}
