//! Concurrency tests for the claim protocol.
//!
//! Many participants race for the same option; the conditional-write
//! contract guarantees at most one winner.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use futures::future::join_all;
use room_service::config::ClaimPolicy;
use room_service::errors::RsError;
use room_service::models::{OptionRecord, RoomRecord};
use room_service::services::SelectionService;
use room_service::storage::{MemoryStorage, Storage};
use std::sync::Arc;

async fn seed_single_option(storage: &MemoryStorage) {
    storage
        .put_room(&RoomRecord {
            id: "r1".to_string(),
            question: "Pick one".to_string(),
            owner_id: "owner".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    storage
        .put_option(&OptionRecord {
            id: "o1".to_string(),
            room_id: "r1".to_string(),
            value: "chips".to_string(),
            owner_id: "owner".to_string(),
            selected_by_id: None,
            selected_by_name: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_claims_have_exactly_one_winner() {
    let storage = Arc::new(MemoryStorage::new());
    seed_single_option(&storage).await;
    let service = SelectionService::new(storage.clone(), ClaimPolicy::Exclusive);

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        let participant = format!("p{i}");
        handles.push(tokio::spawn(async move {
            let result = service.claim("r1", "o1", &participant, None).await;
            (participant, result)
        }));
    }

    let mut winners = Vec::new();
    let mut losses = 0;
    for outcome in join_all(handles).await {
        let (participant, result) = outcome.unwrap();
        match result {
            Ok(_) => winners.push(participant),
            Err(RsError::AlreadyClaimed) => losses += 1,
            Err(e) => panic!("unexpected claim error: {e}"),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one claim must win the race");
    assert_eq!(losses, 15);

    // The stored claim belongs to the winner
    let options = storage.list_options("r1").await.unwrap();
    assert_eq!(options[0].selected_by_id.as_deref(), Some(winners[0].as_str()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_release_claim_race_stays_consistent() {
    let storage = Arc::new(MemoryStorage::new());
    seed_single_option(&storage).await;
    let service = SelectionService::new(storage.clone(), ClaimPolicy::Exclusive);

    service.claim("r1", "o1", "holder", None).await.unwrap();

    // The holder releases while a crowd races to claim. At most one claim
    // can succeed: claims fail until the release lands, then the first
    // claim afterwards wins and blocks the rest.
    let mut handles = Vec::new();
    {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.release("r1", "o1", "holder").await.map(|_| None)
        }));
    }
    for i in 0..8 {
        let service = service.clone();
        let participant = format!("c{i}");
        handles.push(tokio::spawn(async move {
            service
                .claim("r1", "o1", &participant, None)
                .await
                .map(|_| Some(participant))
        }));
    }

    let mut claim_winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(Some(participant)) => claim_winners.push(participant),
            Ok(None) => {}
            Err(RsError::AlreadyClaimed) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(claim_winners.len() <= 1);

    let options = storage.list_options("r1").await.unwrap();
    match claim_winners.first() {
        Some(winner) => {
            assert_eq!(options[0].selected_by_id.as_deref(), Some(winner.as_str()));
        }
        None => assert!(options[0].is_available()),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_retries_by_same_participant_all_succeed() {
    let storage = Arc::new(MemoryStorage::new());
    seed_single_option(&storage).await;
    let service = SelectionService::new(storage.clone(), ClaimPolicy::Exclusive);

    // Duplicate deliveries of the same claim are all acknowledged
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.claim("r1", "o1", "alice", Some("Alice")).await
        }));
    }

    for handle in handles {
        let view = handle.await.unwrap().unwrap();
        assert!(view.selected_by_me);
    }

    let options = storage.list_options("r1").await.unwrap();
    assert_eq!(options[0].selected_by_id.as_deref(), Some("alice"));
}
