//! Retry wrapper
//!
//! Retries a provider's completion call with exponential backoff, but only for
//! failures whose category is retryable (rate limits, network, transient
//! server errors). Everything else is returned on the first attempt.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::warn;

use super::{Completion, CompletionRequest, LlmProvider, SharedProvider};
use crate::constants::retry::{BACKOFF_FACTOR, BASE_DELAY_MS, MAX_DELAY_SECS};
use crate::types::{RagError, Result};

pub struct RetryingProvider {
    inner: SharedProvider,
    backoff: ExponentialBuilder,
    max_retries: usize,
}

impl std::fmt::Debug for RetryingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingProvider")
            .field("inner", &self.inner.name())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl RetryingProvider {
    pub fn new(inner: SharedProvider, max_retries: usize) -> Self {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(BASE_DELAY_MS))
            .with_max_delay(Duration::from_secs(MAX_DELAY_SECS))
            .with_factor(BACKOFF_FACTOR)
            .with_max_times(max_retries)
            .with_jitter();

        Self {
            inner,
            backoff,
            max_retries,
        }
    }

    /// Replace the backoff policy (tests use zero delays)
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff.with_max_times(self.max_retries);
        self
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        (|| async { self.inner.complete(request).await })
            .retry(self.backoff)
            .when(RagError::is_retryable)
            .notify(|err: &RagError, delay: Duration| {
                warn!(
                    provider = self.inner.name(),
                    "Retrying completion in {:?}: {}", delay, err
                );
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorCategory, LlmError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with the given category a fixed number of times, then succeeds
    struct Flaky {
        failures: usize,
        category: ErrorCategory,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for Flaky {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(LlmError::new(self.category, "flaky").into());
            }
            Ok(Completion {
                content: Some("ok".to_string()),
                usage: None,
                model: request.model.clone(),
            })
        }

        fn name(&self) -> &str {
            "flaky"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn wrap(inner: Arc<Flaky>, max_retries: usize) -> RetryingProvider {
        RetryingProvider::new(inner, max_retries).with_backoff(
            ExponentialBuilder::default()
                .with_min_delay(Duration::ZERO)
                .with_max_delay(Duration::ZERO),
        )
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("m", 0.2, "p")
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let inner = Arc::new(Flaky {
            failures: 2,
            category: ErrorCategory::Transient,
            calls: AtomicUsize::new(0),
        });

        let completion = wrap(inner.clone(), 2).complete(&request()).await.unwrap();
        assert_eq!(completion.content.as_deref(), Some("ok"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let inner = Arc::new(Flaky {
            failures: 10,
            category: ErrorCategory::RateLimit,
            calls: AtomicUsize::new(0),
        });

        let err = wrap(inner.clone(), 2).complete(&request()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let inner = Arc::new(Flaky {
            failures: 1,
            category: ErrorCategory::Auth,
            calls: AtomicUsize::new(0),
        });

        let err = wrap(inner.clone(), 2).complete(&request()).await.unwrap_err();
        assert!(matches!(err, RagError::Llm(ref e) if e.category == ErrorCategory::Auth));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
