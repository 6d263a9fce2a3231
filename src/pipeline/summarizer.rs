//! Queued summarization calls
//!
//! Every model call of a pipeline goes through its [`Summarizer`], which owns
//! that pipeline's [`TaskQueue`]. Calls therefore run one at a time, in the
//! order they were submitted, while whatever prepares them runs freely.

use std::future::Future;

use tracing::{debug, warn};

use crate::ai::{CompletionRequest, SharedMetrics, SharedProvider, UsageReport};
use crate::constants::code::MISSING_SUMMARY;
use crate::queue::{QueuedTask, TaskQueue};
use crate::types::{RagError, Result};

/// Text produced by one summarization call
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub text: String,
    pub usage: UsageReport,
}

#[derive(Clone)]
pub struct Summarizer {
    queue: TaskQueue,
    provider: SharedProvider,
    metrics: SharedMetrics,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("queue", &self.queue)
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}

impl Summarizer {
    pub fn new(
        queue: TaskQueue,
        provider: SharedProvider,
        metrics: SharedMetrics,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            queue,
            provider,
            metrics,
            model: model.into(),
            temperature,
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Queue a call for a ready prompt
    pub fn summarize(&self, label: impl Into<String>, prompt: String) -> QueuedTask<Summary> {
        self.summarize_with(label, move || async move { Ok(prompt) })
    }

    /// Queue a call whose prompt is finished inside the queued task.
    ///
    /// `prompt` runs when the task reaches the front of the queue, so it can
    /// await work that was started earlier without delaying its place in line.
    pub fn summarize_with<F, Fut>(&self, label: impl Into<String>, prompt: F) -> QueuedTask<Summary>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let label = label.into();
        let provider = self.provider.clone();
        let metrics = self.metrics.clone();
        let model = self.model.clone();
        let temperature = self.temperature;

        self.queue.enqueue(move || async move {
            let prompt = prompt().await?;
            debug!(label = %label, model = %model, "Requesting summary");

            let request = CompletionRequest::new(model, temperature, prompt);
            let completion = provider.complete(&request).await?;
            let usage = metrics.record(&completion);

            let text = match completion.text() {
                Some(text) => text.to_string(),
                None => {
                    warn!(label = %label, "Model returned no content, storing placeholder");
                    MISSING_SUMMARY.to_string()
                }
            };

            Ok::<_, RagError>(Summary { text, usage })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MetricsCollector, Pricing, TokenUsage};
    use crate::pipeline::testing::ScriptedProvider;
    use std::sync::Arc;

    fn summarizer(provider: Arc<ScriptedProvider>) -> Summarizer {
        Summarizer::new(
            TaskQueue::new("test"),
            provider,
            Arc::new(MetricsCollector::new("test", Pricing::default())),
            "gpt-3.5-turbo",
            0.2,
        )
    }

    #[tokio::test]
    async fn test_empty_reply_becomes_placeholder() {
        let provider = ScriptedProvider::replying(|_, _| Some("   ".to_string()));
        let summary = summarizer(provider)
            .summarize("a.ts", "prompt".to_string())
            .await
            .unwrap();

        assert_eq!(summary.text, "Missing summary");
        assert_eq!(summary.usage, UsageReport::Unavailable);
    }

    #[tokio::test]
    async fn test_usage_is_priced_when_reported() {
        let provider = ScriptedProvider::numbered().with_usage(TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
        });
        let summarizer = summarizer(provider);
        let summary = summarizer
            .summarize("zod", "prompt".to_string())
            .await
            .unwrap();

        match summary.usage {
            UsageReport::Reported { cost_usd, .. } => assert!((cost_usd - 20.0).abs() < 1e-9),
            UsageReport::Unavailable => panic!("usage should be reported"),
        }
        assert_eq!(summarizer.metrics().summary().api_calls, 1);
    }

    #[tokio::test]
    async fn test_calls_run_in_submission_order() {
        let provider = ScriptedProvider::numbered();
        let summarizer = summarizer(provider.clone());

        let first = summarizer.summarize_with("slow", || async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok("first".to_string())
        });
        let second = summarizer.summarize("fast", "second".to_string());

        let (second, first) = tokio::join!(second, first);
        assert_eq!(first.unwrap().text, "summary #0");
        assert_eq!(second.unwrap().text, "summary #1");
        assert_eq!(provider.prompts(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_prompt_failure_skips_the_call() {
        let provider = ScriptedProvider::numbered();
        let summarizer = summarizer(provider.clone());

        let failed = summarizer
            .summarize_with("broken", || async { Err(RagError::Index("unreadable".into())) })
            .await;
        assert!(failed.is_err());
        assert!(provider.prompts().is_empty());

        let ok = summarizer.summarize("next", "p".to_string()).await.unwrap();
        assert_eq!(ok.text, "summary #0");
    }
}
