//! Health check and metrics endpoints.
//!
//! Used by load balancers and monitoring systems.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::state::AppState;

/// Liveness body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Readiness body.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// `"ready"` or `"unavailable"`
    pub status: &'static str,
    /// Failure detail when not ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /health`
///
/// Does not touch the database.
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /ready`
///
/// - 200 OK: the store answers
/// - 503 Service Unavailable: it does not
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    match state.readiness.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ready",
                error: None,
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "unavailable",
                    error: Some(err.to_string()),
                }),
            )
        }
    }
}

/// `GET /metrics`
///
/// Prometheus text format; `404` when no exporter is installed.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
