//! Request translation pipeline
//!
//! Stages, in order:
//! 1. caller authentication ([`auth::extract_bearer_token`])
//! 2. field extraction ([`fields`])
//! 3. identifier resolution ([`resolver::ResolvedFields`])
//! 4. target authorization and credential lookup ([`auth::CredentialResolver`])
//! 5. outbound request construction ([`outbound::OutboundRequest`])
//! 6. downstream call with retry ([`executor::DownstreamExecutor`])
//! 7. response translation ([`translator::translate`])
//!
//! Any stage failing aborts the request; nothing is sent downstream unless
//! stages 1-5 succeed.

pub mod auth;
pub mod executor;
pub mod fields;
pub mod metadata;
pub mod outbound;
pub mod resolver;
pub mod translator;

use axum::http::HeaderValue;

use crate::error::AppResult;
use crate::handlers::AppState;
use crate::handlers::openai::types::{ChatCompletion, ChatCompletionRequest, current_timestamp};
use crate::middleware::RequestId;

use outbound::OutboundRequest;
use resolver::ResolvedFields;

/// Translate one chat completion request into a downstream call and back
pub async fn run(
    state: &AppState,
    request: &ChatCompletionRequest,
    authorization: Option<&HeaderValue>,
    request_id: RequestId,
) -> AppResult<ChatCompletion> {
    let config = state.config();
    let caller_token = auth::extract_bearer_token(authorization)?;

    let query = fields::extract_user_message(request.messages())?;
    let metadata = fields::extract_metadata(request.messages());
    let resolved = ResolvedFields::resolve(request, &metadata, &config.session, &config.defaults)?;

    let credentials = state.credentials();
    credentials.authorize_target(&resolved.target_id)?;
    let credential = credentials.resolve(&resolved.target_id, caller_token)?;

    let outbound = OutboundRequest::build(&resolved, query, &credential)?;

    tracing::info!(
        request_id = %request_id,
        target_id = %resolved.target_id,
        session_key = %resolved.session_key,
        message_count = request.messages().len(),
        metadata_entries = metadata.len(),
        credential = %auth::redact(&credential),
        "Forwarding chat request downstream"
    );
    if config.observability.log_payloads {
        tracing::debug!(
            request_id = %request_id,
            payload = ?outbound.payload,
            "Outbound payload"
        );
    }

    let response = state
        .executor()
        .execute(&outbound, request_id, state.metrics())
        .await?;

    if config.observability.log_payloads {
        tracing::debug!(
            request_id = %request_id,
            status = response.status.as_u16(),
            body = %response.body,
            "Downstream response body"
        );
    }

    let created = current_timestamp(Some(state.metrics()), Some(&request_id));
    let completion = translator::translate(&response, &resolved.target_id, created)?;

    tracing::info!(
        request_id = %request_id,
        target_id = %resolved.target_id,
        completion_id = %completion.id,
        attempts = response.attempts,
        "Chat request completed"
    );

    Ok(completion)
}
