//! Room handlers.
//!
//! Implements the room endpoints:
//!
//! - `POST   /api/v1/rooms` - Create a room with initial options
//! - `GET    /api/v1/rooms` - Rooms owned by the caller
//! - `GET    /api/v1/rooms/{id}` - Viewer-scoped room view
//! - `PATCH  /api/v1/rooms/{id}` - Update the question (owner only)
//! - `POST   /api/v1/rooms/{id}/options` - Append an option (owner only)
//! - `DELETE /api/v1/rooms/{id}/options/{option_id}` - Delete an option
//! - `POST   /api/v1/rooms/{id}/options/{option_id}/claim` - Claim
//! - `POST   /api/v1/rooms/{id}/options/{option_id}/release` - Release
//!
//! Every `/api` route requires the session middleware; the handler reads
//! the participant identity from request extensions. Redaction is done by
//! the projection, so owner and participant fetch the same endpoints.

use crate::errors::RsError;
use crate::middleware::SessionIdentity;
use crate::models::{
    AddOptionRequest, ClaimRequest, CreateRoomRequest, PublicOption, PublicRoom, RoomSummary,
    UpdateQuestionRequest,
};
use crate::observability::metrics;
use crate::routes::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Deserialize a request body manually to return 400 (not Axum's default
/// 422) on malformed JSON.
fn parse_body<T: serde::de::DeserializeOwned>(body: &axum::body::Bytes) -> Result<T, RsError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "rs.handlers.rooms", error = %e, "Invalid request body");
        RsError::BadRequest("Invalid request body".to_string())
    })
}

// ============================================================================
// Handler: POST /api/v1/rooms
// ============================================================================

/// Create a new room owned by the caller.
///
/// # Response
///
/// - 201 Created: owner's view of the new room
/// - 400 Bad Request: invalid body, empty question, oversized fields
/// - 401 Unauthorized: missing session identity
#[instrument(
    skip_all,
    name = "rs.room.create",
    fields(method = "POST", endpoint = "/api/v1/rooms")
)]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<SessionIdentity>,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<PublicRoom>), RsError> {
    let start = Instant::now();

    let request: CreateRoomRequest = parse_body(&body).inspect_err(|_| {
        metrics::record_room_creation("error", Some("bad_request"), start.elapsed());
    })?;

    let room = state
        .selection
        .create_room(&identity.participant_id, &request)
        .await
        .inspect_err(|e| {
            let reason = match e {
                RsError::BadRequest(_) => "bad_request",
                RsError::StorageUnavailable(_) => "storage_unavailable",
                _ => "internal",
            };
            metrics::record_room_creation("error", Some(reason), start.elapsed());
        })?;

    metrics::record_room_creation("success", None, start.elapsed());

    info!(
        target: "rs.handlers.rooms",
        room_id = %room.id,
        option_count = room.options.len(),
        "Room created"
    );

    Ok((StatusCode::CREATED, Json(room)))
}

// ============================================================================
// Handler: GET /api/v1/rooms
// ============================================================================

/// Rooms owned by the caller, newest first.
#[instrument(
    skip_all,
    name = "rs.room.list",
    fields(method = "GET", endpoint = "/api/v1/rooms")
)]
pub async fn list_my_rooms(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<SessionIdentity>,
) -> Result<Json<Vec<RoomSummary>>, RsError> {
    let rooms = state
        .selection
        .rooms_for_owner(&identity.participant_id)
        .await?;

    Ok(Json(rooms))
}

// ============================================================================
// Handler: GET /api/v1/rooms/{id}
// ============================================================================

/// Viewer-scoped room view.
///
/// The projection decides what the caller sees: the owner gets claimant
/// display names, everyone else only availability and their own flag.
///
/// # Response
///
/// - 200 OK: `PublicRoom`
/// - 404 Not Found: no such room
#[instrument(
    skip_all,
    name = "rs.room.get",
    fields(method = "GET", endpoint = "/api/v1/rooms/{id}")
)]
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<SessionIdentity>,
    Path(room_id): Path<String>,
) -> Result<Json<PublicRoom>, RsError> {
    let room = state
        .selection
        .get_room_view(&room_id, &identity.participant_id)
        .await?;

    Ok(Json(room))
}

// ============================================================================
// Handler: PATCH /api/v1/rooms/{id}
// ============================================================================

/// Update the room question. Owner only.
#[instrument(
    skip_all,
    name = "rs.room.update_question",
    fields(method = "PATCH", endpoint = "/api/v1/rooms/{id}")
)]
pub async fn update_question(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<SessionIdentity>,
    Path(room_id): Path<String>,
    body: axum::body::Bytes,
) -> Result<Json<RoomSummary>, RsError> {
    let request: UpdateQuestionRequest = parse_body(&body)?;

    let room = state
        .selection
        .update_question(&room_id, &identity.participant_id, &request)
        .await?;

    Ok(Json(room))
}

// ============================================================================
// Handler: POST /api/v1/rooms/{id}/options
// ============================================================================

/// Append an option to a room. Owner only.
#[instrument(
    skip_all,
    name = "rs.room.add_option",
    fields(method = "POST", endpoint = "/api/v1/rooms/{id}/options")
)]
pub async fn add_option(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<SessionIdentity>,
    Path(room_id): Path<String>,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<PublicOption>), RsError> {
    let request: AddOptionRequest = parse_body(&body)?;

    let option = state
        .selection
        .add_option(&room_id, &identity.participant_id, &request)
        .await?;

    Ok((StatusCode::CREATED, Json(option)))
}

// ============================================================================
// Handler: DELETE /api/v1/rooms/{id}/options/{option_id}
// ============================================================================

/// Delete an option. Creator only.
#[instrument(
    skip_all,
    name = "rs.room.delete_option",
    fields(method = "DELETE", endpoint = "/api/v1/rooms/{id}/options/{option_id}")
)]
pub async fn delete_option(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<SessionIdentity>,
    Path((room_id, option_id)): Path<(String, String)>,
) -> Result<StatusCode, RsError> {
    state
        .selection
        .delete_option(&room_id, &option_id, &identity.participant_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Handler: POST /api/v1/rooms/{id}/options/{option_id}/claim
// ============================================================================

/// Claim an option for the caller.
///
/// The body may carry a display name recorded with the claim (the room
/// owner sees it as `selectedByName`); an empty body is accepted.
///
/// # Response
///
/// - 200 OK: claimant's view of the option (`selectedByMe: true`)
/// - 404 Not Found: no such room or option
/// - 409 Conflict: someone else holds the claim (`ALREADY_CLAIMED`)
/// - 503 Service Unavailable: indeterminate outcome, safe to retry
#[instrument(
    skip_all,
    name = "rs.room.claim",
    fields(method = "POST", endpoint = "/api/v1/rooms/{id}/options/{option_id}/claim")
)]
pub async fn claim_option(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<SessionIdentity>,
    Path((room_id, option_id)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> Result<Json<PublicOption>, RsError> {
    let start = Instant::now();

    let request: ClaimRequest = if body.is_empty() {
        ClaimRequest::default()
    } else {
        parse_body(&body)?
    };
    request.validate()?;

    let display_name = request.trimmed_display_name();

    let result = state
        .selection
        .claim(
            &room_id,
            &option_id,
            &identity.participant_id,
            display_name.as_deref(),
        )
        .await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(RsError::AlreadyClaimed) => "lost_race",
        Err(RsError::NotFound(_)) => "not_found",
        Err(RsError::StorageUnavailable(_)) => "storage_unavailable",
        Err(_) => "error",
    };
    metrics::record_claim_attempt("claim", outcome, start.elapsed());

    Ok(Json(result?))
}

// ============================================================================
// Handler: POST /api/v1/rooms/{id}/options/{option_id}/release
// ============================================================================

/// Release the caller's claim on an option.
///
/// # Response
///
/// - 200 OK: claimant's view of the option (`available: true`)
/// - 404 Not Found: no such room or option
/// - 409 Conflict: a different participant holds the claim
#[instrument(
    skip_all,
    name = "rs.room.release",
    fields(method = "POST", endpoint = "/api/v1/rooms/{id}/options/{option_id}/release")
)]
pub async fn release_option(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<SessionIdentity>,
    Path((room_id, option_id)): Path<(String, String)>,
) -> Result<Json<PublicOption>, RsError> {
    let start = Instant::now();

    let result = state
        .selection
        .release(&room_id, &option_id, &identity.participant_id)
        .await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(RsError::NotClaimHolder) => "not_holder",
        Err(RsError::NotFound(_)) => "not_found",
        Err(RsError::StorageUnavailable(_)) => "storage_unavailable",
        Err(_) => "error",
    };
    metrics::record_claim_attempt("release", outcome, start.elapsed());

    Ok(Json(result?))
}
