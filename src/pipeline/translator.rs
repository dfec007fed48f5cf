//! Downstream response translation
//!
//! Turns the agent service reply into an OpenAI chat completion, or into an
//! error that mirrors the downstream status. Raw downstream text is never
//! passed through to the caller.

use axum::http::StatusCode;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::handlers::openai::types::ChatCompletion;

use super::executor::DownstreamResponse;

/// Downstream statuses treated as success
pub const ACCEPTED_STATUSES: [StatusCode; 3] =
    [StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED];

/// Answer used when a successful reply carries no usable text
pub const FALLBACK_ANSWER: &str = "Sorry, I could not process your request.";

/// Translate a downstream reply
///
/// # Errors
/// - [`AppError::InvalidDownstreamResponse`] if the body is not JSON
/// - [`AppError::Upstream`] if the status is not an accepted success status
pub fn translate(
    response: &DownstreamResponse,
    target_id: &str,
    created: i64,
) -> AppResult<ChatCompletion> {
    let body: Value = serde_json::from_str(&response.body).map_err(|e| {
        AppError::InvalidDownstreamResponse {
            status: response.status.as_u16(),
            reason: format!("body is not valid JSON ({})", e),
        }
    })?;

    if !ACCEPTED_STATUSES.contains(&response.status) {
        return Err(AppError::Upstream {
            status: response.status.as_u16(),
            message: upstream_message(&body),
        });
    }

    let answer = extract_answer(&body).unwrap_or(FALLBACK_ANSWER);
    Ok(ChatCompletion::new(answer, target_id, created))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Answer text: `data.answer`, then `response`, then `message`
pub fn extract_answer(body: &Value) -> Option<&str> {
    non_empty_str(body.pointer("/data/answer"))
        .or_else(|| non_empty_str(body.get("response")))
        .or_else(|| non_empty_str(body.get("message")))
}

/// Message reported for a failed downstream call
///
/// The body's `message` or `error` string when present, otherwise the body
/// itself re-serialized.
pub fn upstream_message(body: &Value) -> String {
    non_empty_str(body.get("message"))
        .or_else(|| non_empty_str(body.get("error")))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
