//! Service descriptor served at `/`

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

pub async fn handler() -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            EndpointInfo {
                method: "POST",
                path: "/v1/chat/completions",
                description: "OpenAI-compatible chat completion",
            },
            EndpointInfo {
                method: "GET",
                path: "/health",
                description: "Liveness check",
            },
            EndpointInfo {
                method: "GET",
                path: "/metrics",
                description: "Prometheus metrics",
            },
        ],
    })
}
