//! Selection engine.
//!
//! Implements create/claim/release/view on top of the storage adapter.
//! Invalid input is rejected before any storage access; ownership-based
//! redaction is enforced here (via the projection), never left to callers.

use crate::config::ClaimPolicy;
use crate::errors::RsError;
use crate::models::{
    AddOptionRequest, CreateRoomRequest, OptionRecord, PublicOption, PublicRoom, RoomRecord,
    RoomSummary, UpdateQuestionRequest,
};
use crate::projection;
use crate::storage::Storage;
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Base62 alphabet for room code generation.
const BASE62_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of generated room codes.
const ROOM_CODE_LENGTH: usize = 8;

/// Number of random bytes for room code generation (48 bits entropy).
const ROOM_CODE_RANDOM_BYTES: usize = 6;

/// Maximum collision retries for room code generation.
const MAX_CODE_COLLISION_RETRIES: usize = 3;

/// Selection engine over an injected storage adapter.
///
/// Safe to run as multiple concurrent instances: claim exclusivity rests
/// entirely on the storage layer's conditional writes, not on anything
/// held in this process.
#[derive(Clone)]
pub struct SelectionService {
    storage: Arc<dyn Storage>,
    policy: ClaimPolicy,
}

impl SelectionService {
    pub fn new(storage: Arc<dyn Storage>, policy: ClaimPolicy) -> Self {
        Self { storage, policy }
    }

    /// Create a room with a fresh unique code and one fresh id per option.
    ///
    /// Returns the owner's projection of the new room.
    #[instrument(skip_all, name = "rs.selection.create_room")]
    pub async fn create_room(
        &self,
        owner_id: &str,
        request: &CreateRoomRequest,
    ) -> Result<PublicRoom, RsError> {
        request.validate()?;

        let question = request.question.trim().to_string();

        // Room code collision is unlikely (48 bits) but retried anyway
        let mut room = None;
        for attempt in 0..MAX_CODE_COLLISION_RETRIES {
            let candidate = RoomRecord {
                id: generate_room_code()?,
                question: question.clone(),
                owner_id: owner_id.to_string(),
                created_at: Utc::now(),
            };

            match self.storage.put_room(&candidate).await {
                Ok(()) => {
                    room = Some(candidate);
                    break;
                }
                Err(RsError::AlreadyExists(_)) => {
                    tracing::debug!(
                        target: "rs.selection",
                        attempt = attempt + 1,
                        "Room code collision, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let room = room.ok_or_else(|| {
            RsError::Internal("Failed to generate unique room code".to_string())
        })?;

        let mut options = Vec::with_capacity(request.options.len());
        for value in &request.options {
            let option = OptionRecord {
                id: Uuid::new_v4().to_string(),
                room_id: room.id.clone(),
                value: value.clone(),
                owner_id: owner_id.to_string(),
                selected_by_id: None,
                selected_by_name: None,
                created_at: Utc::now(),
            };
            self.storage.put_option(&option).await?;
            options.push(option);
        }

        info!(
            target: "rs.selection",
            room_id = %room.id,
            owner_id = %owner_id,
            option_count = options.len(),
            "Room created"
        );

        Ok(projection::render(&room, options, owner_id))
    }

    /// Viewer-scoped room view: loads header and options, projects per
    /// viewer, sorts for display.
    #[instrument(skip_all, name = "rs.selection.get_room_view")]
    pub async fn get_room_view(
        &self,
        room_id: &str,
        viewer_id: &str,
    ) -> Result<PublicRoom, RsError> {
        let room = self
            .storage
            .get_room(room_id)
            .await?
            .ok_or_else(|| RsError::NotFound("Room not found".to_string()))?;

        let options = self.storage.list_options(room_id).await?;

        Ok(projection::render(&room, options, viewer_id))
    }

    /// Claim an option for a participant.
    ///
    /// Under the exclusive policy the participant's previous claim in the
    /// room (if any) is released first; the target option is excluded from
    /// that release so a re-claim of one's own option stays a no-op. The
    /// target is verified to exist before the pre-release, so a claim
    /// naming a bad option id fails without touching a held claim. The
    /// release and the claim are each atomic; the pair is not, and a racer
    /// may take the target in between. The caller then observes
    /// `AlreadyClaimed` while holding nothing in the room.
    #[instrument(skip_all, name = "rs.selection.claim")]
    pub async fn claim(
        &self,
        room_id: &str,
        option_id: &str,
        claimant_id: &str,
        claimant_name: Option<&str>,
    ) -> Result<PublicOption, RsError> {
        if self.policy == ClaimPolicy::Exclusive {
            let options = self.storage.list_options(room_id).await?;
            if !options.iter().any(|o| o.id == option_id) {
                return Err(RsError::NotFound("Option not found".to_string()));
            }

            let released = self
                .storage
                .release_claims(room_id, claimant_id, Some(option_id))
                .await?;
            if released > 0 {
                tracing::debug!(
                    target: "rs.selection",
                    room_id = %room_id,
                    released,
                    "Released previous claim before new claim"
                );
            }
        }

        let option = self
            .storage
            .claim_option(room_id, option_id, claimant_id, claimant_name)
            .await?;

        info!(
            target: "rs.selection",
            room_id = %room_id,
            option_id = %option_id,
            "Option claimed"
        );

        // Claimant's own view; redacted (selected_by_me carries the fact)
        Ok(projection::option_view(&option, claimant_id, false))
    }

    /// Release a participant's claim on an option.
    #[instrument(skip_all, name = "rs.selection.release")]
    pub async fn release(
        &self,
        room_id: &str,
        option_id: &str,
        claimant_id: &str,
    ) -> Result<PublicOption, RsError> {
        let option = self
            .storage
            .release_option(room_id, option_id, claimant_id)
            .await?;

        info!(
            target: "rs.selection",
            room_id = %room_id,
            option_id = %option_id,
            "Option released"
        );

        Ok(projection::option_view(&option, claimant_id, false))
    }

    /// Update the room's question. Owner-only, enforced by the storage
    /// layer's conditional write.
    #[instrument(skip_all, name = "rs.selection.update_question")]
    pub async fn update_question(
        &self,
        room_id: &str,
        owner_id: &str,
        request: &UpdateQuestionRequest,
    ) -> Result<RoomSummary, RsError> {
        request.validate()?;

        let room = self
            .storage
            .update_question(room_id, owner_id, request.question.trim())
            .await?;

        Ok(RoomSummary::from(room))
    }

    /// Append an option to an existing room. Owner-only.
    #[instrument(skip_all, name = "rs.selection.add_option")]
    pub async fn add_option(
        &self,
        room_id: &str,
        owner_id: &str,
        request: &AddOptionRequest,
    ) -> Result<PublicOption, RsError> {
        request.validate()?;

        let room = self
            .storage
            .get_room(room_id)
            .await?
            .ok_or_else(|| RsError::NotFound("Room not found".to_string()))?;

        if !projection::is_owner(owner_id, &room) {
            return Err(RsError::Forbidden(
                "Only the room owner can add options".to_string(),
            ));
        }

        let option = OptionRecord {
            id: Uuid::new_v4().to_string(),
            room_id: room.id.clone(),
            value: request.value.clone(),
            owner_id: owner_id.to_string(),
            selected_by_id: None,
            selected_by_name: None,
            created_at: Utc::now(),
        };
        self.storage.put_option(&option).await?;

        Ok(projection::option_view(&option, owner_id, true))
    }

    /// Delete an option. Creator-only, enforced by the storage layer's
    /// conditional delete.
    #[instrument(skip_all, name = "rs.selection.delete_option")]
    pub async fn delete_option(
        &self,
        room_id: &str,
        option_id: &str,
        owner_id: &str,
    ) -> Result<(), RsError> {
        self.storage
            .delete_option(room_id, option_id, owner_id)
            .await?;

        info!(
            target: "rs.selection",
            room_id = %room_id,
            option_id = %option_id,
            "Option deleted"
        );

        Ok(())
    }

    /// Rooms owned by a participant, newest first.
    #[instrument(skip_all, name = "rs.selection.rooms_for_owner")]
    pub async fn rooms_for_owner(&self, owner_id: &str) -> Result<Vec<RoomSummary>, RsError> {
        let rooms = self.storage.rooms_for_owner(owner_id).await?;
        Ok(rooms.into_iter().map(RoomSummary::from).collect())
    }
}

/// Generate a cryptographically random base62 room code.
fn generate_room_code() -> Result<String, RsError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; ROOM_CODE_RANDOM_BYTES];

    rng.fill(&mut bytes).map_err(|e| {
        tracing::error!(target: "rs.selection", error = %e, "Failed to generate random bytes for room code");
        RsError::Internal("RNG failure".to_string())
    })?;

    // Convert bytes to a big integer (u64 holds 6 bytes = 48 bits)
    let mut value: u64 = 0;
    for &b in &bytes {
        value = (value << 8) | u64::from(b);
    }

    // Encode as base62, extracting digits from least-significant end
    let mut code = Vec::with_capacity(ROOM_CODE_LENGTH);
    for _ in 0..ROOM_CODE_LENGTH {
        let idx = (value % 62) as usize;
        let ch = BASE62_CHARS
            .get(idx)
            .ok_or_else(|| RsError::Internal("Base62 index out of range".to_string()))?;
        code.push(*ch);
        value /= 62;
    }

    // Reverse to get most-significant digit first (consistent ordering)
    code.reverse();

    String::from_utf8(code)
        .map_err(|_| RsError::Internal("Room code contained invalid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_generate_room_code_format() {
        let code = generate_room_code().unwrap();
        assert_eq!(code.len(), ROOM_CODE_LENGTH);
        assert!(code.chars().all(|ch| ch.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_room_code_always_full_length() {
        // Padding must hold even when random bytes produce small values
        for _ in 0..100 {
            assert_eq!(generate_room_code().unwrap().len(), ROOM_CODE_LENGTH);
        }
    }

    #[test]
    fn test_generate_room_code_uniqueness() {
        let code1 = generate_room_code().unwrap();
        let code2 = generate_room_code().unwrap();
        assert_ne!(code1, code2, "Two generated codes should differ");
    }
}
