//! Postgres storage adapter.
//!
//! Single-table layout: every item of one room shares a partition key
//! (`pk = "ROOM#<id>"`) with the item type discriminated by sort key
//! (`sk = "ROOM"` for the header, `sk = "OPTION#<id>"` per option). The
//! secondary index `(gsi1pk, gsi1sk)` answers "rooms owned by participant"
//! without scanning.
//!
//! Claim and release are single conditional `UPDATE` statements: the
//! condition on the stored claimant is evaluated and the row mutated in
//! one atomic step, which is what prevents two participants from racing
//! onto the same option. Correctness does not depend on process-local
//! synchronization, so any number of service instances may share a table.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - Every query runs under a bounded timeout; an elapsed timeout surfaces
//!   as `StorageUnavailable`, never as a definite claim outcome

use crate::errors::RsError;
use crate::models::{OptionRecord, RoomRecord};
use crate::observability::metrics;
use crate::storage::Storage;
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::future::Future;
use std::time::Instant;
use tracing::instrument;

/// Partition key prefix for room partitions.
const ROOM_PK_PREFIX: &str = "ROOM#";

/// Sort key of the room header item.
const ROOM_SK: &str = "ROOM";

/// Sort key prefix for option items.
const OPTION_SK_PREFIX: &str = "OPTION#";

/// Secondary-index partition key prefix for participant identities.
const USER_GSI1PK_PREFIX: &str = "USER#";

fn room_pk(room_id: &str) -> String {
    format!("{ROOM_PK_PREFIX}{room_id}")
}

fn option_sk(option_id: &str) -> String {
    format!("{OPTION_SK_PREFIX}{option_id}")
}

fn owner_gsi1pk(owner_id: &str) -> String {
    format!("{USER_GSI1PK_PREFIX}{owner_id}")
}

/// Postgres-backed [`Storage`] implementation.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
    timeout: std::time::Duration,
}

impl PgStorage {
    pub fn new(pool: PgPool, timeout: std::time::Duration) -> Self {
        Self { pool, timeout }
    }

    /// Run one query under the configured timeout, recording metrics.
    ///
    /// Timeout and connectivity failures map to `StorageUnavailable`;
    /// anything else the backend reports maps to `Database`.
    async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T, RsError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, fut).await {
            Err(_) => {
                metrics::record_storage_query(operation, "timeout", start.elapsed());
                tracing::warn!(
                    target: "rs.storage",
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Storage operation timed out"
                );
                Err(RsError::StorageUnavailable(format!(
                    "{operation} timed out"
                )))
            }
            Ok(Err(e)) => {
                metrics::record_storage_query(operation, "error", start.elapsed());
                Err(map_store_error(operation, &e))
            }
            Ok(Ok(value)) => {
                metrics::record_storage_query(operation, "success", start.elapsed());
                Ok(value)
            }
        }
    }

    /// True if an item with the given key exists. Used only to classify a
    /// failed conditional write (`NotFound` vs. lost condition); the write
    /// itself stays atomic.
    async fn item_exists(&self, pk: &str, sk: &str) -> Result<bool, RsError> {
        let row = self
            .run("item_exists", async {
                sqlx::query("SELECT 1 AS one FROM items WHERE pk = $1 AND sk = $2")
                    .bind(pk)
                    .bind(sk)
                    .fetch_optional(&self.pool)
                    .await
            })
            .await?;

        Ok(row.is_some())
    }
}

/// Map a backend error. Connectivity-class failures are retryable and
/// surface as `StorageUnavailable`.
fn map_store_error(operation: &str, e: &sqlx::Error) -> RsError {
    tracing::warn!(target: "rs.storage", operation, error = %e, "Storage operation failed");

    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            RsError::StorageUnavailable(e.to_string())
        }
        _ => RsError::Database(e.to_string()),
    }
}

/// Map a database row to a room header. Shared by all queries that return
/// header rows.
fn map_room_row(row: &PgRow) -> Result<RoomRecord, RsError> {
    let pk: String = row.get("pk");
    let id = pk
        .strip_prefix(ROOM_PK_PREFIX)
        .ok_or_else(|| RsError::Internal(format!("Malformed room partition key: {pk}")))?
        .to_string();

    Ok(RoomRecord {
        id,
        question: row.get("question"),
        owner_id: row.get("owner_id"),
        created_at: row.get("created_at"),
    })
}

/// Map a database row to an option item.
fn map_option_row(room_id: &str, row: &PgRow) -> Result<OptionRecord, RsError> {
    let sk: String = row.get("sk");
    let id = sk
        .strip_prefix(OPTION_SK_PREFIX)
        .ok_or_else(|| RsError::Internal(format!("Malformed option sort key: {sk}")))?
        .to_string();

    Ok(OptionRecord {
        id,
        room_id: room_id.to_string(),
        value: row.get("option_value"),
        owner_id: row.get("owner_id"),
        selected_by_id: row.get("selected_by_id"),
        selected_by_name: row.get("selected_by_name"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl Storage for PgStorage {
    #[instrument(skip_all, name = "rs.storage.put_room")]
    async fn put_room(&self, room: &RoomRecord) -> Result<(), RsError> {
        let result = self
            .run("put_room", async {
                sqlx::query(
                    r#"
                    INSERT INTO items (pk, sk, gsi1pk, gsi1sk, item_type, question, owner_id, created_at)
                    VALUES ($1, $2, $3, $4, 'room', $5, $6, $7)
                    "#,
                )
                .bind(room_pk(&room.id))
                .bind(ROOM_SK)
                .bind(owner_gsi1pk(&room.owner_id))
                .bind(format!(
                    "{ROOM_PK_PREFIX}{}#{}",
                    room.created_at.to_rfc3339(),
                    room.id
                ))
                .bind(&room.question)
                .bind(&room.owner_id)
                .bind(room.created_at)
                .execute(&self.pool)
                .await
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            // Primary key collision: the room code is taken
            Err(RsError::Database(ref e))
                if e.contains("unique constraint") || e.contains("duplicate key") =>
            {
                Err(RsError::AlreadyExists(format!(
                    "Room {} already exists",
                    room.id
                )))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip_all, name = "rs.storage.get_room")]
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, RsError> {
        let row = self
            .run("get_room", async {
                sqlx::query(
                    "SELECT pk, question, owner_id, created_at FROM items WHERE pk = $1 AND sk = $2",
                )
                .bind(room_pk(room_id))
                .bind(ROOM_SK)
                .fetch_optional(&self.pool)
                .await
            })
            .await?;

        row.as_ref().map(map_room_row).transpose()
    }

    #[instrument(skip_all, name = "rs.storage.update_question")]
    async fn update_question(
        &self,
        room_id: &str,
        owner_id: &str,
        question: &str,
    ) -> Result<RoomRecord, RsError> {
        let pk = room_pk(room_id);

        let row = self
            .run("update_question", async {
                sqlx::query(
                    r#"
                    UPDATE items SET question = $3
                    WHERE pk = $1 AND sk = $2 AND owner_id = $4
                    RETURNING pk, question, owner_id, created_at
                    "#,
                )
                .bind(&pk)
                .bind(ROOM_SK)
                .bind(question)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await
            })
            .await?;

        match row {
            Some(row) => map_room_row(&row),
            None if self.item_exists(&pk, ROOM_SK).await? => Err(RsError::Forbidden(
                "Only the room owner can update the question".to_string(),
            )),
            None => Err(RsError::NotFound("Room not found".to_string())),
        }
    }

    #[instrument(skip_all, name = "rs.storage.put_option")]
    async fn put_option(&self, option: &OptionRecord) -> Result<(), RsError> {
        self.run("put_option", async {
            sqlx::query(
                r#"
                INSERT INTO items (pk, sk, item_type, option_value, owner_id, created_at)
                VALUES ($1, $2, 'option', $3, $4, $5)
                "#,
            )
            .bind(room_pk(&option.room_id))
            .bind(option_sk(&option.id))
            .bind(&option.value)
            .bind(&option.owner_id)
            .bind(option.created_at)
            .execute(&self.pool)
            .await
        })
        .await?;

        Ok(())
    }

    #[instrument(skip_all, name = "rs.storage.list_options")]
    async fn list_options(&self, room_id: &str) -> Result<Vec<OptionRecord>, RsError> {
        let rows = self
            .run("list_options", async {
                sqlx::query(
                    r#"
                    SELECT sk, option_value, owner_id, selected_by_id, selected_by_name, created_at
                    FROM items WHERE pk = $1 AND item_type = 'option'
                    "#,
                )
                .bind(room_pk(room_id))
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        rows.iter().map(|row| map_option_row(room_id, row)).collect()
    }

    #[instrument(skip_all, name = "rs.storage.delete_option")]
    async fn delete_option(
        &self,
        room_id: &str,
        option_id: &str,
        owner_id: &str,
    ) -> Result<OptionRecord, RsError> {
        let pk = room_pk(room_id);
        let sk = option_sk(option_id);

        let row = self
            .run("delete_option", async {
                sqlx::query(
                    r#"
                    DELETE FROM items
                    WHERE pk = $1 AND sk = $2 AND item_type = 'option' AND owner_id = $3
                    RETURNING sk, option_value, owner_id, selected_by_id, selected_by_name, created_at
                    "#,
                )
                .bind(&pk)
                .bind(&sk)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await
            })
            .await?;

        match row {
            Some(row) => map_option_row(room_id, &row),
            None if self.item_exists(&pk, &sk).await? => Err(RsError::Forbidden(
                "Only the option creator can delete it".to_string(),
            )),
            None => Err(RsError::NotFound("Option not found".to_string())),
        }
    }

    #[instrument(skip_all, name = "rs.storage.claim_option")]
    async fn claim_option(
        &self,
        room_id: &str,
        option_id: &str,
        claimant_id: &str,
        claimant_name: Option<&str>,
    ) -> Result<OptionRecord, RsError> {
        let pk = room_pk(room_id);
        let sk = option_sk(option_id);

        // Single conditional write: mutates only while the option is free
        // or already held by this claimant (no-op success on retry). The
        // CASE keeps the stored display name on a retry: the condition
        // evaluates the pre-update row, so a holder re-claiming without a
        // name does not clear what the owner sees.
        let row = self
            .run("claim_option", async {
                sqlx::query(
                    r#"
                    UPDATE items SET
                        selected_by_id = $3,
                        selected_by_name = CASE
                            WHEN selected_by_id IS NULL THEN $4
                            ELSE selected_by_name
                        END
                    WHERE pk = $1 AND sk = $2 AND item_type = 'option'
                      AND (selected_by_id IS NULL OR selected_by_id = $3)
                    RETURNING sk, option_value, owner_id, selected_by_id, selected_by_name, created_at
                    "#,
                )
                .bind(&pk)
                .bind(&sk)
                .bind(claimant_id)
                .bind(claimant_name)
                .fetch_optional(&self.pool)
                .await
            })
            .await?;

        match row {
            Some(row) => map_option_row(room_id, &row),
            // Condition lost or no such option; classify for the caller
            None if self.item_exists(&pk, &sk).await? => Err(RsError::AlreadyClaimed),
            None => Err(RsError::NotFound("Option not found".to_string())),
        }
    }

    #[instrument(skip_all, name = "rs.storage.release_option")]
    async fn release_option(
        &self,
        room_id: &str,
        option_id: &str,
        claimant_id: &str,
    ) -> Result<OptionRecord, RsError> {
        let pk = room_pk(room_id);
        let sk = option_sk(option_id);

        let row = self
            .run("release_option", async {
                sqlx::query(
                    r#"
                    UPDATE items SET selected_by_id = NULL, selected_by_name = NULL
                    WHERE pk = $1 AND sk = $2 AND item_type = 'option'
                      AND (selected_by_id = $3 OR selected_by_id IS NULL)
                    RETURNING sk, option_value, owner_id, selected_by_id, selected_by_name, created_at
                    "#,
                )
                .bind(&pk)
                .bind(&sk)
                .bind(claimant_id)
                .fetch_optional(&self.pool)
                .await
            })
            .await?;

        match row {
            Some(row) => map_option_row(room_id, &row),
            None if self.item_exists(&pk, &sk).await? => Err(RsError::NotClaimHolder),
            None => Err(RsError::NotFound("Option not found".to_string())),
        }
    }

    #[instrument(skip_all, name = "rs.storage.release_claims")]
    async fn release_claims(
        &self,
        room_id: &str,
        claimant_id: &str,
        except_option_id: Option<&str>,
    ) -> Result<u64, RsError> {
        let except_sk = except_option_id.map(option_sk);

        let result = self
            .run("release_claims", async {
                sqlx::query(
                    r#"
                    UPDATE items SET selected_by_id = NULL, selected_by_name = NULL
                    WHERE pk = $1 AND item_type = 'option' AND selected_by_id = $2
                      AND ($3::text IS NULL OR sk <> $3)
                    "#,
                )
                .bind(room_pk(room_id))
                .bind(claimant_id)
                .bind(except_sk)
                .execute(&self.pool)
                .await
            })
            .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip_all, name = "rs.storage.rooms_for_owner")]
    async fn rooms_for_owner(&self, owner_id: &str) -> Result<Vec<RoomRecord>, RsError> {
        // Secondary-index query, most recent first
        let rows = self
            .run("rooms_for_owner", async {
                sqlx::query(
                    r#"
                    SELECT pk, question, owner_id, created_at
                    FROM items
                    WHERE gsi1pk = $1 AND gsi1sk LIKE 'ROOM#%'
                    ORDER BY gsi1sk DESC
                    "#,
                )
                .bind(owner_gsi1pk(owner_id))
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        rows.iter().map(map_room_row).collect()
    }

    #[instrument(skip_all, name = "rs.storage.ping")]
    async fn ping(&self) -> Result<(), RsError> {
        self.run("ping", async {
            sqlx::query("SELECT 1 AS one").fetch_one(&self.pool).await
        })
        .await?;

        Ok(())
    }
}
