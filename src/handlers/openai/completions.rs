//! OpenAI-compatible chat completions handler
//!
//! Handles POST /v1/chat/completions (non-streaming only).

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};

use crate::handlers::AppState;
use crate::metrics::Outcome;
use crate::middleware::RequestId;
use crate::pipeline;

use super::extractor::OpenAiJson;
use super::types::ChatCompletionRequest;

/// POST /v1/chat/completions handler
///
/// Forwards the most recent user message to the downstream agent service
/// and wraps the answer in a single-choice `chat.completion`.
///
/// Routing fields are resolved from the request body, `@meta:` system
/// messages and configuration. The caller must send
/// `Authorization: Bearer <token>`.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    OpenAiJson(request): OpenAiJson<ChatCompletionRequest>,
) -> Response {
    if state.config().observability.log_payloads {
        tracing::debug!(
            request_id = %request_id,
            model = %request.model(),
            messages = ?request.messages(),
            "Inbound chat request"
        );
    }

    let result = pipeline::run(
        &state,
        &request,
        headers.get(header::AUTHORIZATION),
        request_id,
    )
    .await;

    state.metrics().record_request(Outcome::from_result(&result));

    match result {
        Ok(completion) => Json(completion).into_response(),
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!(request_id = %request_id, error = %e, kind = e.kind(), "Chat request failed");
            } else {
                tracing::warn!(request_id = %request_id, error = %e, kind = e.kind(), "Chat request rejected");
            }
            e.into_response()
        }
    }
}
