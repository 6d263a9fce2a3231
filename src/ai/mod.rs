//! AI Integration Layer
//!
//! Chat-completion providers and usage accounting.

pub mod metrics;
pub mod provider;

pub use metrics::{MetricsCollector, MetricsSummary, Pricing, SharedMetrics, UsageReport};
pub use provider::{
    Completion, CompletionRequest, ErrorCategory, ErrorClassifier, LlmError, LlmProvider,
    OllamaProvider, OpenAiProvider, ProviderConfig, RetryingProvider, SharedProvider, TokenUsage,
    create_provider,
};
