//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub asr_models: CheckResult,
    pub tts_models: CheckResult,
    pub connections: usize,
}

/// Result of a single readiness check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    pub models: Vec<String>,
}

impl CheckResult {
    fn from_models(mut models: Vec<String>) -> Self {
        models.sort();
        Self {
            status: if models.is_empty() { "empty" } else { "ok" },
            models,
        }
    }
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe: are any engines registered to serve sessions?
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let asr = CheckResult::from_models(state.engines.asr_models());
    let tts = CheckResult::from_models(state.engines.tts_models());
    let connections = state.connections.count().await;

    let ready = !asr.models.is_empty() && !tts.models.is_empty();
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "not_ready" },
            checks: ReadinessChecks {
                asr_models: asr,
                tts_models: tts,
                connections,
            },
        }),
    )
}

/// Build health check router
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router with access to shared state
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health/ready", get(ready))
        .with_state(state)
}
