//! Error types for chatbridge
//!
//! All errors implement `IntoResponse` for Axum handlers and render as the
//! OpenAI error envelope so SDK clients can surface them unchanged.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::handlers::openai::extractor::OpenAiError;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read configuration file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Downstream service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Downstream service returned an unreadable response (status {status}): {reason}")]
    InvalidDownstreamResponse { status: u16, reason: String },

    /// The endpoint and transport error are logged by the executor and
    /// never sent to the caller.
    #[error("Downstream service {cause} after {attempts} attempt(s)")]
    DownstreamUnreachable {
        attempts: usize,
        cause: UnreachableCause,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why the last downstream attempt produced no response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachableCause {
    Timeout,
    Connection,
}

impl std::fmt::Display for UnreachableCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out"),
            Self::Connection => f.write_str("could not be reached"),
        }
    }
}

impl AppError {
    /// HTTP status returned to the caller for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) | Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            // Only error classes are mirrored; anything else from the
            // downstream service is reported as a gateway failure.
            Self::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::InvalidDownstreamResponse { .. } | Self::DownstreamUnreachable { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Stable machine-readable error kind, used as the envelope `code`
    /// and as the `outcome` metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Config(_) => "config_error",
            Self::Validation(_) => "validation_error",
            Self::MissingField(_) => "missing_field",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Upstream { .. } => "upstream_error",
            Self::InvalidDownstreamResponse { .. } => "bad_gateway",
            Self::DownstreamUnreachable { .. } => "downstream_unreachable",
            Self::Internal(_) => "internal_error",
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::MissingField(_) => "invalid_request_error",
            Self::Unauthorized(_) => "authentication_error",
            Self::Forbidden(_) => "permission_error",
            Self::Upstream { .. }
            | Self::InvalidDownstreamResponse { .. }
            | Self::DownstreamUnreachable { .. } => "upstream_error",
            _ => "server_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Validation(msg)
            | Self::MissingField(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Internal(msg) => msg.clone(),
            _ => self.to_string(),
        };

        let body = Json(OpenAiError::new(message, self.error_type(), Some(self.kind())));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
