//! HTTP routes for the room service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_session};
use crate::services::SelectionService;
use crate::storage::Storage;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage adapter (used directly by the readiness probe).
    pub storage: Arc<dyn Storage>,

    /// Selection engine.
    pub selection: SelectionService,

    /// Service configuration.
    pub config: Config,
}

impl AppState {
    /// Assemble state from a storage adapter and configuration.
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        let selection = SelectionService::new(storage.clone(), config.claim_policy);
        Self {
            storage,
            selection,
            config,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public, unversioned
/// - `/ready` - Readiness probe (checks storage) - public, unversioned
/// - `/metrics` - Prometheus metrics endpoint - public, unversioned
/// - `/api/v1/rooms...` - Room endpoints - session identity required
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    // Public operational routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Participant-scoped routes (session identity required)
    let api_routes = Router::new()
        .route(
            "/api/v1/rooms",
            post(handlers::create_room).get(handlers::list_my_rooms),
        )
        .route(
            "/api/v1/rooms/:id",
            get(handlers::get_room).patch(handlers::update_question),
        )
        .route("/api/v1/rooms/:id/options", post(handlers::add_option))
        .route(
            "/api/v1/rooms/:id/options/:option_id",
            delete(handlers::delete_option),
        )
        .route(
            "/api/v1/rooms/:id/options/:option_id/claim",
            post(handlers::claim_option),
        )
        .route(
            "/api/v1/rooms/:id/options/:option_id/release",
            post(handlers::release_option),
        )
        .route_layer(middleware::from_fn(require_session))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
