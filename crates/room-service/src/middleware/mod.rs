//! Middleware for the room service.
//!
//! - `session` - Participant identity extraction for `/api` routes
//! - `http_metrics` - HTTP request metrics middleware

pub mod http_metrics;
pub mod session;

pub use http_metrics::http_metrics_middleware;
pub use session::{require_session, SessionIdentity};
