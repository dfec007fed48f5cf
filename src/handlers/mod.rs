//! HTTP request handlers for the chatbridge API

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::pipeline::auth::CredentialResolver;
use crate::pipeline::executor::DownstreamExecutor;

pub mod health;
pub mod metrics;
pub mod openai;
pub mod root;

/// Application state shared across all handlers
///
/// Everything is built once from the loaded configuration and is read-only
/// afterwards. All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    credentials: Arc<CredentialResolver>,
    executor: Arc<DownstreamExecutor>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the metrics registry cannot
    /// be created.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let credentials = Arc::new(CredentialResolver::new(&config.auth));
        let executor = Arc::new(DownstreamExecutor::new(&config.downstream, config.retry)?);
        let metrics = Arc::new(
            Metrics::new()
                .map_err(|e| AppError::Internal(format!("Failed to initialize metrics: {}", e)))?,
        );

        Ok(Self {
            config,
            credentials,
            executor,
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    pub fn executor(&self) -> &DownstreamExecutor {
        &self.executor
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Full application router with middleware applied
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root::handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .route("/v1/chat/completions", post(openai::completions::handler))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
