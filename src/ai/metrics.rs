//! Usage Metrics Collection
//!
//! Per-call usage reports and a thread-safe collector that aggregates them
//! across a pipeline run.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = MetricsCollector::new("dependencies", Pricing::default());
//! let report = metrics.record(&completion);
//! info!("{}", metrics.summary().display());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::ai::provider::{Completion, TokenUsage};
use crate::constants::pricing;

// =============================================================================
// Pricing
// =============================================================================

/// USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: pricing::INPUT_PER_MILLION,
            output_per_million: pricing::OUTPUT_PER_MILLION,
        }
    }
}

impl Pricing {
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.input_tokens as f64 * self.input_per_million
            + usage.output_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

// =============================================================================
// Usage Report
// =============================================================================

/// Usage of one completion call. Missing usage is its own state, not zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UsageReport {
    Reported {
        input: u32,
        output: u32,
        cost_usd: f64,
        model: String,
    },
    Unavailable,
}

impl UsageReport {
    pub fn from_completion(completion: &Completion, pricing: &Pricing) -> Self {
        match &completion.usage {
            Some(usage) => Self::Reported {
                input: usage.input_tokens,
                output: usage.output_tokens,
                cost_usd: pricing.cost(usage),
                model: completion.model.clone(),
            },
            None => Self::Unavailable,
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Reported { .. })
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reported {
                input,
                output,
                cost_usd,
                model,
            } => write!(
                f,
                "{} input / {} output tokens, ${:.4} ({})",
                input, output, cost_usd, model
            ),
            Self::Unavailable => write!(f, "No usage reported"),
        }
    }
}

// =============================================================================
// Metrics Collector
// =============================================================================

/// Thread-safe usage collector for one pipeline run.
///
/// Cost is accumulated in microdollars so it can live in an atomic.
pub struct MetricsCollector {
    /// Run label used in summaries
    label: String,
    pricing: Pricing,
    start_time: Instant,
    /// Completion calls recorded
    api_calls: AtomicU32,
    /// Calls whose usage was not reported
    unreported_calls: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_cost_micros: AtomicU64,
}

/// Summary statistics for one pipeline run
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub label: String,
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub unreported_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
}

impl MetricsCollector {
    pub fn new(label: impl Into<String>, pricing: Pricing) -> Self {
        Self {
            label: label.into(),
            pricing,
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            unreported_calls: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_cost_micros: AtomicU64::new(0),
        }
    }

    /// Record one completion and return its usage report
    pub fn record(&self, completion: &Completion) -> UsageReport {
        let report = UsageReport::from_completion(completion, &self.pricing);
        self.record_report(&report);
        report
    }

    pub fn record_report(&self, report: &UsageReport) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        match report {
            UsageReport::Reported {
                input,
                output,
                cost_usd,
                ..
            } => {
                self.input_tokens
                    .fetch_add(*input as u64, Ordering::Relaxed);
                self.output_tokens
                    .fetch_add(*output as u64, Ordering::Relaxed);
                let cost_micros = (cost_usd * 1_000_000.0).round() as u64;
                self.total_cost_micros
                    .fetch_add(cost_micros, Ordering::Relaxed);
            }
            UsageReport::Unavailable => {
                self.unreported_calls.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);

        MetricsSummary {
            label: self.label.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls: self.api_calls.load(Ordering::Relaxed),
            unreported_calls: self.unreported_calls.load(Ordering::Relaxed),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            total_cost_usd: self.total_cost_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "{}: {} calls in {:.1}s, {} tokens (input: {}, output: {}), estimated cost ${:.4}{}",
            self.label,
            self.api_calls,
            self.total_duration_ms as f64 / 1000.0,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.total_cost_usd,
            if self.unreported_calls > 0 {
                format!(", {} without usage", self.unreported_calls)
            } else {
                String::new()
            }
        )
    }
}

/// Shared metrics collector for pipeline stages
pub type SharedMetrics = Arc<MetricsCollector>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(usage: Option<TokenUsage>) -> Completion {
        Completion {
            content: Some("guide".to_string()),
            usage,
            model: "gpt-4o".to_string(),
        }
    }

    #[test]
    fn test_cost_formula() {
        let usage = TokenUsage::from_openai(1_000, 200);
        // 1000 * 5 / 1e6 + 200 * 15 / 1e6
        assert!((Pricing::default().cost(&usage) - 0.008).abs() < 1e-12);
    }

    #[test]
    fn test_report_from_usage() {
        let report = UsageReport::from_completion(
            &completion(Some(TokenUsage::from_openai(2_000_000, 1_000_000))),
            &Pricing::default(),
        );

        assert_eq!(
            report,
            UsageReport::Reported {
                input: 2_000_000,
                output: 1_000_000,
                cost_usd: 25.0,
                model: "gpt-4o".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_usage_is_unavailable_not_zero() {
        let report = UsageReport::from_completion(&completion(None), &Pricing::default());
        assert_eq!(report, UsageReport::Unavailable);
        assert_eq!(report.to_string(), "No usage reported");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "unavailable" }));
    }

    #[test]
    fn test_collector_totals() {
        let metrics = MetricsCollector::new("guides", Pricing::default());

        metrics.record(&completion(Some(TokenUsage::from_openai(1_000, 200))));
        metrics.record(&completion(None));
        metrics.record(&completion(Some(TokenUsage::from_openai(1_000, 200))));

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 3);
        assert_eq!(summary.unreported_calls, 1);
        assert_eq!(summary.total_tokens, 2_400);
        assert!((summary.total_cost_usd - 0.016).abs() < 1e-9);
        assert!(summary.display().contains("1 without usage"));
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = Arc::new(MetricsCollector::new("concurrent", Pricing::default()));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record(&completion(Some(TokenUsage::from_openai(10, 5))));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1000);
        assert_eq!(summary.input_tokens, 10_000);
        assert_eq!(summary.output_tokens, 5_000);
    }
}
