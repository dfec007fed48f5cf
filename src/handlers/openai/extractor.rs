//! JSON extractor and error envelope for the OpenAI-compatible surface
//!
//! Wraps Axum's `Json` extractor so malformed bodies are reported in the
//! error format OpenAI SDKs (LangChain, n8n, the official libraries) parse.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// OpenAI-compatible error response structure
///
/// ```json
/// {
///   "error": {
///     "message": "...",
///     "type": "invalid_request_error",
///     "param": null,
///     "code": "validation_error"
///   }
/// }
/// ```
#[derive(Debug, serde::Serialize)]
pub struct OpenAiError {
    pub error: OpenAiErrorBody,
}

#[derive(Debug, serde::Serialize)]
pub struct OpenAiErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl OpenAiError {
    pub fn new(message: impl Into<String>, error_type: &str, code: Option<&str>) -> Self {
        Self {
            error: OpenAiErrorBody {
                message: message.into(),
                error_type: error_type.to_string(),
                param: None,
                code: code.map(str::to_string),
            },
        }
    }

    /// Error for a request body that could not be accepted
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(message, "invalid_request_error", Some("invalid_body"))
    }
}

/// JSON rejection rendered as an [`OpenAiError`]
///
/// - JSON syntax errors → 400 Bad Request
/// - Data errors (missing fields, failed validation) → 422 Unprocessable Entity
/// - Missing content type → 415 Unsupported Media Type
pub struct OpenAiJsonRejection(JsonRejection);

impl IntoResponse for OpenAiJsonRejection {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            JsonRejection::JsonSyntaxError(_) => (StatusCode::BAD_REQUEST, self.0.body_text()),
            JsonRejection::JsonDataError(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.body_text())
            }
            JsonRejection::MissingJsonContentType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Content-Type must be application/json".to_string(),
            ),
            _ => (StatusCode::BAD_REQUEST, self.0.body_text()),
        };
        tracing::debug!(status = %status, reason = %message, "Rejected request body");
        (status, Json(OpenAiError::invalid_request(message))).into_response()
    }
}

/// Drop-in replacement for `axum::Json` in OpenAI-compatible handlers
pub struct OpenAiJson<T>(pub T);

impl<S, T> FromRequest<S> for OpenAiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = OpenAiJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(OpenAiJson(value)),
            Err(rejection) => Err(OpenAiJsonRejection(rejection)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_error_serializes_envelope() {
        let error = OpenAiError::new("target id missing", "invalid_request_error", Some("missing_field"));
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["error"]["message"], "target id missing");
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["code"], "missing_field");
        assert!(json["error"]["param"].is_null());
    }

    #[test]
    fn test_invalid_request_uses_body_code() {
        let json = serde_json::to_value(OpenAiError::invalid_request("bad json")).unwrap();
        assert_eq!(json["error"]["code"], "invalid_body");
        assert_eq!(json["error"]["type"], "invalid_request_error");
    }
}
