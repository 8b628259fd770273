//! Session identity middleware.
//!
//! Session issuance and transport are external to this service (the edge
//! issues an opaque participant id per session and forwards it on every
//! request). This middleware only requires the id to be present and
//! injects it into request extensions; the core never interprets it.

use crate::errors::RsError;
use axum::{
    extract::Request,
    middleware::Next,
    response::IntoResponse,
};
use tracing::instrument;

/// Header carrying the opaque participant id, set by the session edge.
pub const PARTICIPANT_ID_HEADER: &str = "x-participant-id";

/// Opaque participant identity for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub participant_id: String,
}

/// Session middleware for participant-scoped routes.
///
/// # Response
///
/// - Returns 401 Unauthorized if the participant id header is missing or
///   not valid UTF-8
/// - Continues to the next handler with `SessionIdentity` in extensions
///   otherwise
#[instrument(skip_all, name = "rs.middleware.session")]
pub async fn require_session(mut req: Request, next: Next) -> Result<impl IntoResponse, RsError> {
    let participant_id = req
        .headers()
        .get(PARTICIPANT_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "rs.middleware.session", "Missing participant id header");
            RsError::Unauthorized
        })?
        .to_string();

    req.extensions_mut()
        .insert(SessionIdentity { participant_id });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    async fn whoami(Extension(identity): Extension<SessionIdentity>) -> String {
        identity.participant_id
    }

    fn test_app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn(require_session))
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let request = HttpRequest::builder()
            .uri("/whoami")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_blank_header_is_unauthorized() {
        let request = HttpRequest::builder()
            .uri("/whoami")
            .header(PARTICIPANT_ID_HEADER, "   ")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_identity_injected() {
        let request = HttpRequest::builder()
            .uri("/whoami")
            .header(PARTICIPANT_ID_HEADER, "participant-42")
            .body(Body::empty())
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"participant-42");
    }
}
