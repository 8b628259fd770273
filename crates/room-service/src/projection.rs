//! Viewer-scoped room projection.
//!
//! Pure functions, no I/O: the same internal records are rendered
//! differently per viewer, so the claim logic never forks into "public"
//! and "private" code paths. Ownership-based redaction happens here: a
//! non-owner viewer never receives another participant's identity, only a
//! boolean and a self-referential flag.

use crate::models::{OptionRecord, PublicOption, PublicRoom, RoomRecord};

/// True iff the viewer created the room.
pub fn is_owner(viewer_id: &str, room: &RoomRecord) -> bool {
    room.owner_id == viewer_id
}

/// Redacted view of one option for one viewer.
///
/// `owner` grants visibility of the claimant's display name; everyone else
/// learns only `available` and whether they themselves hold the claim.
pub fn option_view(option: &OptionRecord, viewer_id: &str, owner: bool) -> PublicOption {
    let selected_by_me = option
        .selected_by_id
        .as_deref()
        .is_some_and(|id| id == viewer_id);

    let selected_by_name = if owner {
        option.selected_by_name.clone()
    } else {
        None
    };

    PublicOption {
        id: option.id.clone(),
        value: option.value.clone(),
        available: option.is_available(),
        selected_by_me,
        selected_by_name,
    }
}

/// Sort options for display: ascending by value (case-sensitive
/// lexicographic), ties broken by ascending id. Deterministic regardless
/// of storage retrieval order.
pub fn sort_options(options: &mut [OptionRecord]) {
    options.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.id.cmp(&b.id)));
}

/// Render the viewer-scoped room view. Deterministic given its inputs.
pub fn render(room: &RoomRecord, mut options: Vec<OptionRecord>, viewer_id: &str) -> PublicRoom {
    let owner = is_owner(viewer_id, room);
    sort_options(&mut options);

    PublicRoom {
        id: room.id.clone(),
        question: room.question.clone(),
        owned_by_me: owner,
        options: options
            .iter()
            .map(|option| option_view(option, viewer_id, owner))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::Utc;

    fn room() -> RoomRecord {
        RoomRecord {
            id: "r1".to_string(),
            question: "Pick a snack".to_string(),
            owner_id: "owner".to_string(),
            created_at: Utc::now(),
        }
    }

    fn option(id: &str, value: &str, selected_by: Option<(&str, &str)>) -> OptionRecord {
        OptionRecord {
            id: id.to_string(),
            room_id: "r1".to_string(),
            value: value.to_string(),
            owner_id: "owner".to_string(),
            selected_by_id: selected_by.map(|(id, _)| id.to_string()),
            selected_by_name: selected_by.map(|(_, name)| name.to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_owner() {
        assert!(is_owner("owner", &room()));
        assert!(!is_owner("alice", &room()));
    }

    #[test]
    fn test_non_owner_never_sees_claimant_identity() {
        let claimed = option("o1", "chips", Some(("alice", "Alice")));

        let view = option_view(&claimed, "bob", false);
        assert!(!view.available);
        assert!(!view.selected_by_me);
        assert_eq!(view.selected_by_name, None);

        // Redaction also holds in the serialized form
        let json = serde_json::to_string(&view).expect("serialization should succeed");
        assert!(!json.contains("alice"));
        assert!(!json.contains("Alice"));
    }

    #[test]
    fn test_claimant_sees_selected_by_me() {
        let claimed = option("o1", "chips", Some(("alice", "Alice")));

        let view = option_view(&claimed, "alice", false);
        assert!(view.selected_by_me);
        assert_eq!(view.selected_by_name, None);
    }

    #[test]
    fn test_owner_sees_claimant_name() {
        let claimed = option("o1", "chips", Some(("alice", "Alice")));

        let view = option_view(&claimed, "owner", true);
        assert!(!view.available);
        assert_eq!(view.selected_by_name, Some("Alice".to_string()));
    }

    #[test]
    fn test_sort_by_value_then_id() {
        // Insertion order must not matter
        let options = vec![
            option("b", "apple", None),
            option("a", "apple", None),
            option("z", "banana", None),
        ];

        let view = render(&room(), options, "viewer");
        let order: Vec<(&str, &str)> = view
            .options
            .iter()
            .map(|o| (o.id.as_str(), o.value.as_str()))
            .collect();
        assert_eq!(order, vec![("a", "apple"), ("b", "apple"), ("z", "banana")]);

        // Reversed insertion order yields the same rendering
        let reversed = vec![
            option("z", "banana", None),
            option("a", "apple", None),
            option("b", "apple", None),
        ];
        let view2 = render(&room(), reversed, "viewer");
        assert_eq!(view.options, view2.options);
    }

    #[test]
    fn test_render_sets_owned_by_me() {
        assert!(render(&room(), vec![], "owner").owned_by_me);
        assert!(!render(&room(), vec![], "alice").owned_by_me);
    }
}
