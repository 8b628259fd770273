//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks the storage backend
//! - `/metrics`: Prometheus exposition

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Returns a simple "OK" to indicate the process is running. Does NOT
/// check any dependencies - failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Checks the storage backend to determine if the service can handle
/// traffic. Returns 200 if ready, 503 if not.
///
/// Error messages are intentionally generic; actual errors are logged
/// server-side.
#[tracing::instrument(skip_all, name = "rs.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Err(e) = state.storage.ping().await {
        tracing::warn!(target: "rs.handlers.health", error = %e, "Readiness check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                storage: Some("unhealthy"),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            storage: Some("healthy"),
            error: None,
        }),
    )
}

/// Prometheus metrics handler.
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
