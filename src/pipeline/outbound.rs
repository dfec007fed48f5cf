//! Outbound request construction
//!
//! Pure functions: the same resolved fields always produce the same payload
//! and headers.

use axum::http::{HeaderMap, HeaderValue, header};
use serde::Serialize;

use crate::error::{AppError, AppResult};

use super::resolver::ResolvedFields;

/// JSON body sent to the downstream agent service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundPayload {
    pub target_id: String,
    pub session_key: String,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Payload plus headers for one downstream call
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub payload: OutboundPayload,
    pub headers: HeaderMap,
}

impl OutboundRequest {
    /// # Errors
    /// Returns [`AppError::Internal`] when the credential cannot be used as a
    /// header value.
    pub fn build(fields: &ResolvedFields, query: &str, credential: &str) -> AppResult<Self> {
        Ok(Self {
            payload: build_payload(fields, query),
            headers: build_headers(credential)?,
        })
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

pub fn build_payload(fields: &ResolvedFields, query: &str) -> OutboundPayload {
    OutboundPayload {
        target_id: fields.target_id.clone(),
        session_key: fields.session_key.clone(),
        query: query.to_string(),
        custom_prompt: non_empty(fields.custom_prompt.as_ref()),
        callback_url: non_empty(fields.callback_url.as_ref()),
    }
}

/// `Authorization: Token <credential>` and `Content-Type: application/json`
pub fn build_headers(credential: &str) -> AppResult<HeaderMap> {
    let mut authorization = HeaderValue::from_str(&format!("Token {}", credential)).map_err(|_| {
        AppError::Internal("downstream credential contains invalid header characters".to_string())
    })?;
    authorization.set_sensitive(true);

    let mut headers = HeaderMap::with_capacity(2);
    headers.insert(header::AUTHORIZATION, authorization);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(headers)
}
