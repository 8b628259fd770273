//! Room service models.
//!
//! Internal records mirror the stored single-table items; the viewer-scoped
//! `PublicRoom`/`PublicOption` projections are computed per request and
//! never persisted. Field names serialize as camelCase to match the
//! original wire format (`ownedByMe`, `selectedByMe`, `selectedByName`).

use crate::errors::RsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum question length.
pub const MAX_QUESTION_LENGTH: usize = 1500;

/// Maximum number of options accepted at room creation.
pub const MAX_OPTIONS_PER_CREATE: usize = 200;

/// Maximum option value length.
pub const MAX_OPTION_VALUE_LENGTH: usize = 1000;

/// Maximum claimant display name length.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

/// Room header as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    /// Shareable room code, assigned at creation, immutable.
    pub id: String,

    /// Free-text prompt, mutable only by the owner.
    pub question: String,

    /// Participant identity that created the room, immutable.
    pub owner_id: String,

    pub created_at: DateTime<Utc>,
}

/// Option item as stored.
///
/// `available` is derived, never stored: an option is available exactly
/// when `selected_by_id` is `None`. Keeping a single source of truth is
/// what lets the conditional write guarantee the invariant atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRecord {
    /// Unique within the room, immutable.
    pub id: String,

    pub room_id: String,

    /// Free-text label, immutable after creation.
    pub value: String,

    /// Participant who created the option (audit; not exposed publicly).
    pub owner_id: String,

    /// Participant currently holding the claim, if any.
    pub selected_by_id: Option<String>,

    /// Display name recorded with the claim, shown only to the room owner.
    pub selected_by_name: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl OptionRecord {
    /// True when no participant currently holds a claim.
    pub fn is_available(&self) -> bool {
        self.selected_by_id.is_none()
    }
}

// ============================================================================
// Request types
// ============================================================================

/// Request body for POST /api/v1/rooms.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub question: String,

    /// Initial option labels. May be empty; duplicates are allowed
    /// (options are identity-distinct even with equal labels).
    #[serde(default)]
    pub options: Vec<String>,
}

impl CreateRoomRequest {
    pub fn validate(&self) -> Result<(), RsError> {
        validate_question(&self.question)?;

        if self.options.len() > MAX_OPTIONS_PER_CREATE {
            return Err(RsError::BadRequest(format!(
                "At most {MAX_OPTIONS_PER_CREATE} options may be created at once"
            )));
        }

        for value in &self.options {
            validate_option_value(value)?;
        }

        Ok(())
    }
}

/// Request body for PATCH /api/v1/rooms/{id}.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuestionRequest {
    pub question: String,
}

impl UpdateQuestionRequest {
    pub fn validate(&self) -> Result<(), RsError> {
        validate_question(&self.question)
    }
}

/// Request body for POST /api/v1/rooms/{id}/options.
#[derive(Debug, Clone, Deserialize)]
pub struct AddOptionRequest {
    pub value: String,
}

impl AddOptionRequest {
    pub fn validate(&self) -> Result<(), RsError> {
        validate_option_value(&self.value)
    }
}

/// Request body for POST /api/v1/rooms/{id}/options/{option_id}/claim.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Optional display name recorded with the claim; the room owner sees
    /// it as `selectedByName`.
    pub display_name: Option<String>,
}

impl ClaimRequest {
    pub fn validate(&self) -> Result<(), RsError> {
        if let Some(name) = &self.display_name {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(RsError::BadRequest(
                    "Display name must not be blank".to_string(),
                ));
            }
            if trimmed.len() > MAX_DISPLAY_NAME_LENGTH {
                return Err(RsError::BadRequest(format!(
                    "Display name must be at most {MAX_DISPLAY_NAME_LENGTH} characters"
                )));
            }
        }
        Ok(())
    }

    /// Trimmed display name, if one was provided.
    pub fn trimmed_display_name(&self) -> Option<String> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }
}

fn validate_question(question: &str) -> Result<(), RsError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(RsError::BadRequest(
            "Question must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_QUESTION_LENGTH {
        return Err(RsError::BadRequest(format!(
            "Question must be at most {MAX_QUESTION_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_option_value(value: &str) -> Result<(), RsError> {
    if value.is_empty() {
        return Err(RsError::BadRequest(
            "Option value must not be empty".to_string(),
        ));
    }
    if value.len() > MAX_OPTION_VALUE_LENGTH {
        return Err(RsError::BadRequest(format!(
            "Option value must be at most {MAX_OPTION_VALUE_LENGTH} characters"
        )));
    }
    Ok(())
}

// ============================================================================
// Viewer-scoped projections
// ============================================================================

/// Redacted option view.
///
/// A non-owner viewer learns only whether the option is free and whether
/// *they* hold the claim, never who else does. The owner's view carries
/// the claimant's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOption {
    pub id: String,
    pub value: String,
    pub available: bool,
    pub selected_by_me: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_by_name: Option<String>,
}

/// Viewer-scoped room view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRoom {
    pub id: String,
    pub question: String,
    pub owned_by_me: bool,
    pub options: Vec<PublicOption>,
}

/// Room header summary for listings (GET /api/v1/rooms).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub question: String,
    pub created_at: DateTime<Utc>,
}

impl From<RoomRecord> for RoomSummary {
    fn from(room: RoomRecord) -> Self {
        RoomSummary {
            id: room.id,
            question: room.question,
            created_at: room.created_at,
        }
    }
}

/// Readiness check response for the `/ready` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Storage connectivity status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<&'static str>,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn create_request(question: &str, options: &[&str]) -> CreateRoomRequest {
        CreateRoomRequest {
            question: question.to_string(),
            options: options.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_create_request_valid() {
        assert!(create_request("Pick a snack", &["chips", "fruit"])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_create_request_empty_question_rejected() {
        assert!(create_request("", &["chips"]).validate().is_err());
        assert!(create_request("   ", &["chips"]).validate().is_err());
    }

    #[test]
    fn test_create_request_empty_options_allowed() {
        assert!(create_request("Pick a snack", &[]).validate().is_ok());
    }

    #[test]
    fn test_create_request_duplicate_values_allowed() {
        assert!(create_request("Pick a snack", &["chips", "chips"])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_create_request_too_many_options_rejected() {
        let options: Vec<String> = (0..=MAX_OPTIONS_PER_CREATE)
            .map(|i| format!("option-{i}"))
            .collect();
        let request = CreateRoomRequest {
            question: "Pick one".to_string(),
            options,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_blank_option_value_rejected() {
        assert!(create_request("Pick a snack", &[""]).validate().is_err());
    }

    #[test]
    fn test_question_too_long_rejected() {
        let request = UpdateQuestionRequest {
            question: "q".repeat(MAX_QUESTION_LENGTH + 1),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_claim_request_display_name() {
        let request = ClaimRequest {
            display_name: Some("  Alice  ".to_string()),
        };
        assert!(request.validate().is_ok());
        assert_eq!(request.trimmed_display_name(), Some("Alice".to_string()));

        let blank = ClaimRequest {
            display_name: Some("   ".to_string()),
        };
        assert!(blank.validate().is_err());

        let absent = ClaimRequest { display_name: None };
        assert!(absent.validate().is_ok());
        assert_eq!(absent.trimmed_display_name(), None);
    }

    #[test]
    fn test_available_is_derived_from_claim() {
        let mut option = OptionRecord {
            id: "o1".to_string(),
            room_id: "r1".to_string(),
            value: "chips".to_string(),
            owner_id: "owner".to_string(),
            selected_by_id: None,
            selected_by_name: None,
            created_at: Utc::now(),
        };
        assert!(option.is_available());

        option.selected_by_id = Some("alice".to_string());
        assert!(!option.is_available());
    }

    #[test]
    fn test_public_option_omits_absent_claimant_name() {
        let option = PublicOption {
            id: "o1".to_string(),
            value: "chips".to_string(),
            available: true,
            selected_by_me: false,
            selected_by_name: None,
        };
        let json = serde_json::to_value(&option).expect("serialization should succeed");
        assert!(json.get("selectedByName").is_none());
        assert_eq!(json["selectedByMe"], false);
    }
}
