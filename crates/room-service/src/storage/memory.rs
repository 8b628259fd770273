//! In-memory storage adapter.
//!
//! Implements the same contract as `PgStorage` for tests and local
//! development: the conditional-claim semantics are evaluated under one
//! mutex acquisition, so the exclusivity guarantee holds within a single
//! process. It is not a substitute for the backing store's conditional
//! write when multiple service instances run.

use crate::errors::RsError;
use crate::models::{OptionRecord, RoomRecord};
use crate::storage::Storage;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug)]
struct RoomPartition {
    room: RoomRecord,
    options: HashMap<String, OptionRecord>,
}

/// In-process [`Storage`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    partitions: Mutex<HashMap<String, RoomPartition>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put_room(&self, room: &RoomRecord) -> Result<(), RsError> {
        let mut partitions = self.partitions.lock().await;

        if partitions.contains_key(&room.id) {
            return Err(RsError::AlreadyExists(format!(
                "Room {} already exists",
                room.id
            )));
        }

        partitions.insert(
            room.id.clone(),
            RoomPartition {
                room: room.clone(),
                options: HashMap::new(),
            },
        );

        Ok(())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, RsError> {
        let partitions = self.partitions.lock().await;
        Ok(partitions.get(room_id).map(|p| p.room.clone()))
    }

    async fn update_question(
        &self,
        room_id: &str,
        owner_id: &str,
        question: &str,
    ) -> Result<RoomRecord, RsError> {
        let mut partitions = self.partitions.lock().await;

        let partition = partitions
            .get_mut(room_id)
            .ok_or_else(|| RsError::NotFound("Room not found".to_string()))?;

        if partition.room.owner_id != owner_id {
            return Err(RsError::Forbidden(
                "Only the room owner can update the question".to_string(),
            ));
        }

        partition.room.question = question.to_string();
        Ok(partition.room.clone())
    }

    async fn put_option(&self, option: &OptionRecord) -> Result<(), RsError> {
        let mut partitions = self.partitions.lock().await;

        let partition = partitions
            .get_mut(&option.room_id)
            .ok_or_else(|| RsError::NotFound("Room not found".to_string()))?;

        partition.options.insert(option.id.clone(), option.clone());
        Ok(())
    }

    async fn list_options(&self, room_id: &str) -> Result<Vec<OptionRecord>, RsError> {
        let partitions = self.partitions.lock().await;

        // An unknown room is an empty partition, same as the table query
        Ok(partitions
            .get(room_id)
            .map(|p| p.options.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_option(
        &self,
        room_id: &str,
        option_id: &str,
        owner_id: &str,
    ) -> Result<OptionRecord, RsError> {
        let mut partitions = self.partitions.lock().await;

        let partition = partitions
            .get_mut(room_id)
            .ok_or_else(|| RsError::NotFound("Option not found".to_string()))?;

        match partition.options.get(option_id) {
            None => Err(RsError::NotFound("Option not found".to_string())),
            Some(option) if option.owner_id != owner_id => Err(RsError::Forbidden(
                "Only the option creator can delete it".to_string(),
            )),
            Some(_) => partition
                .options
                .remove(option_id)
                .ok_or_else(|| RsError::NotFound("Option not found".to_string())),
        }
    }

    async fn claim_option(
        &self,
        room_id: &str,
        option_id: &str,
        claimant_id: &str,
        claimant_name: Option<&str>,
    ) -> Result<OptionRecord, RsError> {
        let mut partitions = self.partitions.lock().await;

        let option = partitions
            .get_mut(room_id)
            .and_then(|p| p.options.get_mut(option_id))
            .ok_or_else(|| RsError::NotFound("Option not found".to_string()))?;

        // Condition evaluated and row mutated under the same lock: free,
        // or already held by this claimant (no-op success on retry).
        match option.selected_by_id.as_deref() {
            None => {
                option.selected_by_id = Some(claimant_id.to_string());
                option.selected_by_name = claimant_name.map(ToString::to_string);
                Ok(option.clone())
            }
            Some(holder) if holder == claimant_id => Ok(option.clone()),
            Some(_) => Err(RsError::AlreadyClaimed),
        }
    }

    async fn release_option(
        &self,
        room_id: &str,
        option_id: &str,
        claimant_id: &str,
    ) -> Result<OptionRecord, RsError> {
        let mut partitions = self.partitions.lock().await;

        let option = partitions
            .get_mut(room_id)
            .and_then(|p| p.options.get_mut(option_id))
            .ok_or_else(|| RsError::NotFound("Option not found".to_string()))?;

        match option.selected_by_id.as_deref() {
            Some(holder) if holder != claimant_id => Err(RsError::NotClaimHolder),
            // Held by the claimant, or already free (no-op success on retry)
            _ => {
                option.selected_by_id = None;
                option.selected_by_name = None;
                Ok(option.clone())
            }
        }
    }

    async fn release_claims(
        &self,
        room_id: &str,
        claimant_id: &str,
        except_option_id: Option<&str>,
    ) -> Result<u64, RsError> {
        let mut partitions = self.partitions.lock().await;

        let Some(partition) = partitions.get_mut(room_id) else {
            return Ok(0);
        };

        let mut released = 0;
        for option in partition.options.values_mut() {
            if except_option_id.is_some_and(|except| except == option.id) {
                continue;
            }
            if option.selected_by_id.as_deref() == Some(claimant_id) {
                option.selected_by_id = None;
                option.selected_by_name = None;
                released += 1;
            }
        }

        Ok(released)
    }

    async fn rooms_for_owner(&self, owner_id: &str) -> Result<Vec<RoomRecord>, RsError> {
        let partitions = self.partitions.lock().await;

        let mut rooms: Vec<RoomRecord> = partitions
            .values()
            .filter(|p| p.room.owner_id == owner_id)
            .map(|p| p.room.clone())
            .collect();

        // Newest first, matching the secondary-index ordering
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rooms)
    }

    async fn ping(&self) -> Result<(), RsError> {
        Ok(())
    }
}
