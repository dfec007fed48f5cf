//! Health check endpoint

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// API version reported by the health endpoint
pub const API_VERSION: &str = "v1";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub api_version: &'static str,
}

/// GET /health
///
/// Liveness only; the downstream service is not probed.
pub async fn handler() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            api_version: API_VERSION,
        }),
    )
}
