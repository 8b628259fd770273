//! End-to-end scenario tests against a real server instance.
//!
//! Spawns the service on an ephemeral port with in-memory storage and
//! drives it over HTTP with reqwest.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use room_service::storage::MemoryStorage;
use room_test_utils::TestRoomServer;
use serde_json::{json, Value};
use std::sync::Arc;

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn option_id(room: &Value, value: &str) -> String {
    room["options"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["value"] == value)
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_probes_respond() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn(Arc::new(MemoryStorage::new())).await?;
    let client = client();

    let response = client.get(format!("{}/health", server.url())).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get(format!("{}/metrics", server.url())).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

/// Full lifecycle: an organizer sets up a snack poll, two participants
/// pick, switch, and everyone sees the view appropriate to them.
#[tokio::test]
async fn test_snack_poll_scenario() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn(Arc::new(MemoryStorage::new())).await?;
    let client = client();
    let base = server.url();

    // Organizer creates the room
    let room: Value = client
        .post(format!("{base}/api/v1/rooms"))
        .header("x-participant-id", "organizer")
        .json(&json!({"question": "Pick a snack", "options": ["chips", "fruit"]}))
        .send()
        .await?
        .json()
        .await?;
    let room_id = room["id"].as_str().unwrap().to_string();
    let chips = option_id(&room, "chips");
    let fruit = option_id(&room, "fruit");

    // Participant A takes chips
    let response = client
        .post(format!("{base}/api/v1/rooms/{room_id}/options/{chips}/claim"))
        .header("x-participant-id", "participant-a")
        .json(&json!({"displayName": "Ana"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Participant B tries chips and loses, then takes fruit
    let response = client
        .post(format!("{base}/api/v1/rooms/{room_id}/options/{chips}/claim"))
        .header("x-participant-id", "participant-b")
        .json(&json!({"displayName": "Ben"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "ALREADY_CLAIMED");

    let response = client
        .post(format!("{base}/api/v1/rooms/{room_id}/options/{fruit}/claim"))
        .header("x-participant-id", "participant-b")
        .json(&json!({"displayName": "Ben"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Organizer sees both names
    let owner_view: Value = client
        .get(format!("{base}/api/v1/rooms/{room_id}"))
        .header("x-participant-id", "organizer")
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(owner_view["ownedByMe"], true);
    let names: Vec<&str> = owner_view["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["selectedByName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ana", "Ben"]);

    // Participant A sees their own claim but not Ben's name
    let a_view: Value = client
        .get(format!("{base}/api/v1/rooms/{room_id}"))
        .header("x-participant-id", "participant-a")
        .send()
        .await?
        .json()
        .await?;
    let a_options = a_view["options"].as_array().unwrap();
    assert_eq!(a_options[0]["value"], "chips");
    assert_eq!(a_options[0]["selectedByMe"], true);
    assert_eq!(a_options[1]["selectedByMe"], false);
    assert_eq!(a_options[1]["available"], false);
    assert!(a_options[1].get("selectedByName").is_none());

    // A switches to a newly added option; the exclusive policy frees chips
    let cookies: Value = client
        .post(format!("{base}/api/v1/rooms/{room_id}/options"))
        .header("x-participant-id", "organizer")
        .json(&json!({"value": "cookies"}))
        .send()
        .await?
        .json()
        .await?;
    let cookies_id = cookies["id"].as_str().unwrap();

    let response = client
        .post(format!(
            "{base}/api/v1/rooms/{room_id}/options/{cookies_id}/claim"
        ))
        .header("x-participant-id", "participant-a")
        .json(&json!({"displayName": "Ana"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let final_view: Value = client
        .get(format!("{base}/api/v1/rooms/{room_id}"))
        .header("x-participant-id", "participant-b")
        .send()
        .await?
        .json()
        .await?;
    let by_value = |v: &str| -> Value {
        final_view["options"]
            .as_array()
            .unwrap()
            .iter()
            .find(|o| o["value"] == v)
            .unwrap()
            .clone()
    };
    assert_eq!(by_value("chips")["available"], true);
    assert_eq!(by_value("cookies")["available"], false);
    assert_eq!(by_value("fruit")["selectedByMe"], true);

    Ok(())
}

#[tokio::test]
async fn test_requests_without_identity_rejected() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn(Arc::new(MemoryStorage::new())).await?;

    let response = client()
        .get(format!("{}/api/v1/rooms", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
