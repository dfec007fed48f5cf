//! Resilient downstream call
//!
//! One POST per attempt, each bounded by the configured timeout. Transient
//! statuses and connection-level failures are retried with exponential
//! backoff until the attempt budget is spent. Every other response is handed
//! back immediately.

use axum::http::StatusCode;
use std::time::{Duration, Instant};

use crate::config::{DownstreamConfig, RetryConfig};
use crate::error::{AppError, AppResult, UnreachableCause};
use crate::metrics::{AttemptResult, Metrics};
use crate::middleware::RequestId;

use super::outbound::OutboundRequest;

/// Statuses that justify another attempt
pub const TRANSIENT_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

pub fn is_transient_status(status: StatusCode) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

/// Delay to wait after the given failed attempt (1-indexed)
///
/// `base * 2^(attempt-1)`, capped at `max_backoff_ms`. With the default
/// 700 ms base: 700 ms after the first attempt, 1400 ms after the second.
pub fn calculate_backoff(policy: &RetryConfig, attempt: usize) -> Duration {
    let exponent = (attempt as u32).saturating_sub(1);
    let delay_ms = policy
        .backoff_base_ms()
        .saturating_mul(2_u64.saturating_pow(exponent))
        .min(policy.max_backoff_ms());
    Duration::from_millis(delay_ms)
}

/// Raw downstream answer, before translation
#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub body: String,
    /// Attempts used to obtain this response
    pub attempts: usize,
}

/// Issues the downstream call with timeout and bounded retry
///
/// Holds a pooled `reqwest::Client`; cloning is cheap and every request
/// shares the same connection pool.
#[derive(Debug, Clone)]
pub struct DownstreamExecutor {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    policy: RetryConfig,
}

impl DownstreamExecutor {
    /// # Errors
    /// Returns [`AppError::Config`] if the HTTP client cannot be built.
    pub fn new(downstream: &DownstreamConfig, policy: RetryConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(downstream.timeout_seconds());
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: downstream.url().to_string(),
            timeout,
            policy,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn policy(&self) -> &RetryConfig {
        &self.policy
    }

    /// Send `request`, retrying transient failures
    ///
    /// Returns the first non-transient response, or the last transient one
    /// once the budget is spent.
    ///
    /// # Errors
    /// Returns [`AppError::DownstreamUnreachable`] when the final attempt
    /// failed without any response (connect error, reset, timeout). The
    /// endpoint and transport error only go to the log.
    pub async fn execute(
        &self,
        request: &OutboundRequest,
        request_id: RequestId,
        metrics: &Metrics,
    ) -> AppResult<DownstreamResponse> {
        let max_attempts = self.policy.max_attempts();

        let mut attempt = 1;
        loop {
            let started = Instant::now();
            let outcome = self.send_once(request).await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let is_last = attempt >= max_attempts;

            match outcome {
                Ok((status, text)) => {
                    let transient = is_transient_status(status);
                    let result = if transient {
                        AttemptResult::Transient
                    } else {
                        AttemptResult::Completed
                    };
                    metrics.record_downstream_attempt(result, elapsed_ms);

                    if !transient || is_last {
                        tracing::debug!(
                            request_id = %request_id,
                            status = status.as_u16(),
                            attempt,
                            duration_ms = elapsed_ms,
                            "Downstream responded"
                        );
                        return Ok(DownstreamResponse {
                            status,
                            body: text,
                            attempts: attempt,
                        });
                    }

                    tracing::warn!(
                        request_id = %request_id,
                        status = status.as_u16(),
                        attempt,
                        max_attempts,
                        "Downstream returned transient status, retrying"
                    );
                }
                Err(e) => {
                    metrics.record_downstream_attempt(AttemptResult::Transport, elapsed_ms);

                    let (cause, reason) = if e.is_timeout() {
                        (
                            UnreachableCause::Timeout,
                            format!("timed out after {} seconds", self.timeout.as_secs()),
                        )
                    } else {
                        (UnreachableCause::Connection, e.to_string())
                    };

                    if is_last {
                        tracing::error!(
                            request_id = %request_id,
                            endpoint = %self.endpoint,
                            attempts = attempt,
                            error = %reason,
                            "Downstream unreachable, retry budget exhausted"
                        );
                        return Err(AppError::DownstreamUnreachable {
                            attempts: attempt,
                            cause,
                        });
                    }

                    tracing::warn!(
                        request_id = %request_id,
                        endpoint = %self.endpoint,
                        attempt,
                        max_attempts,
                        error = %reason,
                        "Downstream connection failed, retrying"
                    );
                }
            }

            tokio::time::sleep(calculate_backoff(&self.policy, attempt)).await;
            attempt += 1;
        }
    }

    /// One attempt; a body read failure counts as a connection failure
    async fn send_once(
        &self,
        request: &OutboundRequest,
    ) -> Result<(StatusCode, String), reqwest::Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(request.headers.clone())
            .json(&request.payload)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}
