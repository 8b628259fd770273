//! Storage adapter.
//!
//! The selection engine talks to storage through the [`Storage`] trait.
//! `PgStorage` is the durable implementation (single-table Postgres layout
//! with conditional writes); `MemoryStorage` implements the identical
//! contract in-process for tests and local development.
//!
//! The crux of the whole system is that `claim_option` and
//! `release_option` are single conditional writes: the mutation succeeds
//! only if a precondition on the *stored* claimant holds, so at most one
//! of any set of racing claims can win across any number of service
//! instances, without process-local locks.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

use crate::errors::RsError;
use crate::models::{OptionRecord, RoomRecord};
use async_trait::async_trait;

/// Durable room/option store.
///
/// Failure policy: expected outcomes surface as `NotFound`,
/// `AlreadyClaimed`, `NotClaimHolder`, `AlreadyExists`, or `Forbidden`;
/// transient backend failures (connectivity, timeout) surface as
/// `StorageUnavailable` so callers never mistake an indeterminate outcome
/// for a definite loss.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a new room header. Fails with `AlreadyExists` if the room id
    /// is taken (the engine retries with a fresh code).
    async fn put_room(&self, room: &RoomRecord) -> Result<(), RsError>;

    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, RsError>;

    /// Update the question, conditional on `owner_id` matching the stored
    /// owner. `Forbidden` when the room exists but the caller is not the
    /// owner.
    async fn update_question(
        &self,
        room_id: &str,
        owner_id: &str,
        question: &str,
    ) -> Result<RoomRecord, RsError>;

    async fn put_option(&self, option: &OptionRecord) -> Result<(), RsError>;

    /// All options of a room, in storage order (callers sort for display).
    /// An unknown room yields an empty list, not `NotFound`.
    async fn list_options(&self, room_id: &str) -> Result<Vec<OptionRecord>, RsError>;

    /// Delete an option, conditional on `owner_id` matching its creator.
    async fn delete_option(
        &self,
        room_id: &str,
        option_id: &str,
        owner_id: &str,
    ) -> Result<OptionRecord, RsError>;

    /// Atomically claim an option: succeeds only if the option is
    /// currently unclaimed or already held by `claimant_id` (a retried
    /// claim is a no-op success that keeps the stored display name).
    /// Losing the race yields `AlreadyClaimed`.
    async fn claim_option(
        &self,
        room_id: &str,
        option_id: &str,
        claimant_id: &str,
        claimant_name: Option<&str>,
    ) -> Result<OptionRecord, RsError>;

    /// Atomically release a claim: succeeds only if the option is held by
    /// `claimant_id` or already free (a retried release is a no-op
    /// success). A claim held by someone else yields `NotClaimHolder`.
    async fn release_option(
        &self,
        room_id: &str,
        option_id: &str,
        claimant_id: &str,
    ) -> Result<OptionRecord, RsError>;

    /// Release every claim held by `claimant_id` in the room, except the
    /// option named in `except_option_id`. Returns the number of claims
    /// released. Used by the exclusive claim policy.
    async fn release_claims(
        &self,
        room_id: &str,
        claimant_id: &str,
        except_option_id: Option<&str>,
    ) -> Result<u64, RsError>;

    /// Rooms owned by a participant, newest first (secondary-index query,
    /// no scan).
    async fn rooms_for_owner(&self, owner_id: &str) -> Result<Vec<RoomRecord>, RsError>;

    /// Connectivity probe for the readiness check.
    async fn ping(&self) -> Result<(), RsError>;
}
