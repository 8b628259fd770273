//! Metrics definitions for the room service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `rs_` prefix for the room service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max
//! - `endpoint`: parameterized paths, unknown paths collapse to "/other"
//! - `status`: success, error, timeout
//! - `operation`: bounded by code (put_room, claim_option, ...)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle for
/// serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the Prometheus recorder fails to install (e.g.
/// already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("rs_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("rs_storage_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set storage query buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("rs_claim".to_string()),
            &[0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500],
        )
        .map_err(|e| format!("Failed to set claim buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("rs_room_creation".to_string()),
            &[0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000],
        )
        .map_err(|e| format!("Failed to set room creation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `rs_http_requests_total`, `rs_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures ALL HTTP responses including framework-level errors (415,
/// 400 on JSON parse, 404, 405).
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("rs_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("rs_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Record a storage operation.
///
/// Metric: `rs_storage_queries_total`, `rs_storage_query_duration_seconds`
/// Labels: `operation`, `status`
pub fn record_storage_query(operation: &str, status: &str, duration: Duration) {
    histogram!("rs_storage_query_duration_seconds",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("rs_storage_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a claim or release attempt outcome.
///
/// Metric: `rs_claim_attempts_total`, `rs_claim_duration_seconds`
/// Labels: `operation` (claim/release), `outcome`
/// (ok/lost_race/not_holder/not_found/error)
pub fn record_claim_attempt(operation: &str, outcome: &str, duration: Duration) {
    histogram!("rs_claim_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("rs_claim_attempts_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record room creation outcome.
///
/// Metric: `rs_room_creations_total`, `rs_room_creation_duration_seconds`
/// Labels: `status`, `reason`
///
/// Uses its own histogram: the HTTP middleware already samples
/// `rs_http_request_duration_seconds` for every response, and recording
/// here again would double-count the create-room series.
pub fn record_room_creation(status: &str, reason: Option<&str>, duration: Duration) {
    histogram!("rs_room_creation_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("rs_room_creations_total",
        "status" => status.to_string(),
        "reason" => reason.unwrap_or("none").to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
///
/// Replaces dynamic segments (room codes, option ids) with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health" | "/ready" | "/metrics" | "/api/v1/rooms" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

/// Normalize paths with dynamic segments.
fn normalize_dynamic_endpoint(path: &str) -> String {
    if path.starts_with("/api/v1/rooms/") {
        let parts: Vec<&str> = path.split('/').collect();

        // /api/v1/rooms/{id}
        if parts.len() == 5 {
            return "/api/v1/rooms/{id}".to_string();
        }

        // /api/v1/rooms/{id}/options
        if parts.len() == 6 && parts.get(5) == Some(&"options") {
            return "/api/v1/rooms/{id}/options".to_string();
        }

        // /api/v1/rooms/{id}/options/{option_id}
        if parts.len() == 7 && parts.get(5) == Some(&"options") {
            return "/api/v1/rooms/{id}/options/{option_id}".to_string();
        }

        // /api/v1/rooms/{id}/options/{option_id}/claim | /release
        if parts.len() == 8 && parts.get(5) == Some(&"options") {
            if let Some(action) = parts.get(7) {
                if *action == "claim" || *action == "release" {
                    return format!("/api/v1/rooms/{{id}}/options/{{option_id}}/{action}");
                }
            }
        }
    }

    // Unknown paths normalized to "/other" to bound cardinality
    "/other".to_string()
}
