//! Prometheus metrics collection for chatbridge
//!
//! Tracks:
//! - Inbound requests by outcome kind
//! - Downstream attempts by result class, with their latency
//! - System clock errors
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::error::AppError;

/// Final outcome of one inbound request
///
/// Labels come from [`AppError::kind`], so the label set stays bounded by
/// the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(&'static str),
}

impl Outcome {
    pub fn from_result<T>(result: &Result<T, AppError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => Self::Failed(e.kind()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed(kind) => *kind,
        }
    }
}

/// Result class of a single downstream attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    /// Any non-retryable response, success or not
    Completed,
    /// 500/502/503/504
    Transient,
    /// No response at all (connect error, reset, timeout)
    Transport,
}

impl AttemptResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Transient => "transient_status",
            Self::Transport => "transport_error",
        }
    }
}

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    downstream_attempts: IntCounterVec,
    downstream_duration: HistogramVec,
    clock_errors: IntCounter,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "chatbridge_requests_total",
                "Total number of chat completion requests by outcome",
            ),
            &["outcome"],
        )?;

        // Cardinality: 3 result classes
        let downstream_attempts = IntCounterVec::new(
            Opts::new(
                "chatbridge_downstream_attempts_total",
                "Total number of downstream call attempts by result class",
            ),
            &["result"],
        )?;

        let downstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "chatbridge_downstream_duration_ms",
                "Downstream attempt latency in milliseconds",
            )
            .buckets(vec![
                10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 20000.0,
            ]),
            &["result"],
        )?;

        // Alert on any increment: the host clock is before the UNIX epoch
        let clock_errors = IntCounter::with_opts(Opts::new(
            "chatbridge_clock_errors_total",
            "Total number of system clock errors detected (clock before UNIX epoch)",
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(downstream_attempts.clone()))?;
        registry.register(Box::new(downstream_duration.clone()))?;
        registry.register(Box::new(clock_errors.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            downstream_attempts,
            downstream_duration,
            clock_errors,
        })
    }

    pub fn record_request(&self, outcome: Outcome) {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    pub fn requests_count(&self, outcome: Outcome) -> u64 {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    /// Record one downstream attempt and its latency
    ///
    /// Non-finite or negative durations are counted but not observed, since
    /// they would corrupt the histogram.
    pub fn record_downstream_attempt(&self, result: AttemptResult, duration_ms: f64) {
        self.downstream_attempts
            .with_label_values(&[result.as_str()])
            .inc();

        if !duration_ms.is_finite() || duration_ms < 0.0 {
            tracing::warn!(
                result = result.as_str(),
                duration_ms,
                "Discarding invalid downstream duration sample"
            );
            return;
        }

        self.downstream_duration
            .with_label_values(&[result.as_str()])
            .observe(duration_ms);
    }

    pub fn downstream_attempts_count(&self, result: AttemptResult) -> u64 {
        self.downstream_attempts
            .with_label_values(&[result.as_str()])
            .get()
    }

    pub fn clock_error(&self) {
        self.clock_errors.inc();
    }

    pub fn clock_errors_count(&self) -> u64 {
        self.clock_errors.get()
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_families.len(),
                    "Prometheus text encoder failed"
                );
                e
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_registers_all_families() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_request(Outcome::Success);
        metrics.record_downstream_attempt(AttemptResult::Completed, 12.0);
        metrics.clock_error();

        let output = metrics.gather().unwrap();
        assert!(output.contains("chatbridge_requests_total"));
        assert!(output.contains("chatbridge_downstream_attempts_total"));
        assert!(output.contains("chatbridge_downstream_duration_ms"));
        assert!(output.contains("chatbridge_clock_errors_total"));
    }

    #[test]
    fn test_outcome_labels_follow_error_kind() {
        let ok: Result<(), AppError> = Ok(());
        assert_eq!(Outcome::from_result(&ok).as_str(), "success");

        let err: Result<(), AppError> = Err(AppError::Forbidden("no".into()));
        assert_eq!(Outcome::from_result(&err).as_str(), "forbidden");
    }

    #[test]
    fn test_record_request_increments_by_outcome() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request(Outcome::Success);
        metrics.record_request(Outcome::Success);
        metrics.record_request(Outcome::Failed("unauthorized"));

        assert_eq!(metrics.requests_count(Outcome::Success), 2);
        assert_eq!(metrics.requests_count(Outcome::Failed("unauthorized")), 1);

        let output = metrics.gather().unwrap();
        assert!(output.contains(r#"chatbridge_requests_total{outcome="success"} 2"#));
    }

    #[test]
    fn test_attempts_counted_by_result() {
        let metrics = Metrics::new().unwrap();
        metrics.record_downstream_attempt(AttemptResult::Transient, 5.0);
        metrics.record_downstream_attempt(AttemptResult::Transient, 7.0);
        metrics.record_downstream_attempt(AttemptResult::Transport, 1.0);

        assert_eq!(metrics.downstream_attempts_count(AttemptResult::Transient), 2);
        assert_eq!(metrics.downstream_attempts_count(AttemptResult::Transport), 1);
        assert_eq!(metrics.downstream_attempts_count(AttemptResult::Completed), 0);
    }

    #[test]
    fn test_invalid_duration_still_counts_attempt() {
        let metrics = Metrics::new().unwrap();
        metrics.record_downstream_attempt(AttemptResult::Completed, f64::NAN);
        metrics.record_downstream_attempt(AttemptResult::Completed, -1.0);

        assert_eq!(metrics.downstream_attempts_count(AttemptResult::Completed), 2);
        let output = metrics.gather().unwrap();
        assert!(!output.contains("NaN"));
    }

    #[test]
    fn test_clock_errors_counted() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.clock_errors_count(), 0);
        metrics.clock_error();
        assert_eq!(metrics.clock_errors_count(), 1);
    }
}
