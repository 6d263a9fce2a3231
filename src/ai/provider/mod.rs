//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for single-prompt chat completions.
//! Providers return the raw message text (which may be absent) together with
//! token usage when the endpoint reports it.
//!
//! ## Modules
//!
//! - `openai`: OpenAI-compatible `/chat/completions`
//! - `ollama`: local Ollama `/api/chat`
//! - `retry`: bounded exponential backoff around any provider

mod ollama;
mod openai;
mod retry;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use retry::RetryingProvider;

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::{network, retry as retry_defaults};
use crate::types::{RagError, Result};

// =============================================================================
// Request / Response
// =============================================================================

/// One user-role prompt sent to a chat model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, temperature: f32, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature,
            prompt: prompt.into(),
        }
    }
}

/// Model reply. `content` is `None` when the endpoint returned no text.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: String,
}

impl Completion {
    /// Content, treating blank text as absent
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Token usage reported by the endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from OpenAI-style usage response
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }

    /// Create from Ollama-style usage response
    pub fn from_ollama(prompt_eval_count: u32, eval_count: u32) -> Self {
        Self {
            input_tokens: prompt_eval_count,
            output_tokens: eval_count,
        }
    }
}

/// Shared LLM provider type, handed to every pipeline explicitly
pub type SharedProvider = Arc<dyn LlmProvider>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// Note: API keys are never serialized and are redacted in debug output.
/// Each provider converts the key to SecretString internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "openai", "ollama"
    pub provider: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// API key (OpenAI-compatible endpoints)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Retries after the first attempt for retryable failures (0 disables)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn default_max_retries() -> usize {
    retry_defaults::DEFAULT_MAX_RETRIES
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            api_key: None,
            api_base: None,
            max_retries: retry_defaults::DEFAULT_MAX_RETRIES,
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the model's reply
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Check if the endpoint is reachable
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    let provider: SharedProvider = match config.provider.as_str() {
        "openai" => Arc::new(OpenAiProvider::new(config.clone())?),
        "ollama" => Arc::new(OllamaProvider::new(config.clone())?),
        _ => {
            return Err(RagError::Config(format!(
                "Unknown provider: {}. Supported: openai, ollama",
                config.provider
            )));
        }
    };

    if config.max_retries == 0 {
        return Ok(provider);
    }
    Ok(Arc::new(RetryingProvider::new(provider, config.max_retries)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_text_treats_blank_as_missing() {
        let blank = Completion {
            content: Some("  \n".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.text(), None);

        let none = Completion::default();
        assert_eq!(none.text(), None);

        let some = Completion {
            content: Some(" summary \n".to_string()),
            ..Default::default()
        };
        assert_eq!(some.text(), Some(" summary \n"));
    }

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_create_provider_rejects_unknown() {
        let config = ProviderConfig {
            provider: "telepathy".to_string(),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn test_create_ollama_provider_with_retry() {
        let config = ProviderConfig {
            provider: "ollama".to_string(),
            max_retries: 3,
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
