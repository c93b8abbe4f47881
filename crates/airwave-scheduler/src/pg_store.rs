//! Postgres-backed schedule store — one row per scheduled deletion,
//! shared bounded connection pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::action::{ActionId, DeferredAction};
use crate::store::{ScheduleStore, StoreError};

/// Rows are keyed by `(message_id, channel_id)`; `put` is an upsert,
/// `load_all` a full scan. Row-level atomicity replaces the file
/// backend's writer lock. Pool exhaustion and connection failures all
/// surface as `Unavailable`.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and ensure the schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("connect: {e}")))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS deletion_schedule (
                message_id  BIGINT      NOT NULL,
                channel_id  BIGINT      NOT NULL,
                delete_time TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (message_id, channel_id)
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("migrate: {e}")))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn put(&self, action: &DeferredAction) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO deletion_schedule (message_id, channel_id, delete_time)
             VALUES ($1, $2, $3)
             ON CONFLICT (message_id, channel_id)
             DO UPDATE SET delete_time = EXCLUDED.delete_time",
        )
        .bind(action.id.message_id as i64)
        .bind(action.id.channel_id as i64)
        .bind(action.due_time)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("put {}: {e}", action.id)))?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<DeferredAction>, StoreError> {
        let rows: Vec<(i64, i64, DateTime<Utc>)> =
            sqlx::query_as("SELECT message_id, channel_id, delete_time FROM deletion_schedule")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Unavailable(format!("load_all: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(message_id, channel_id, delete_time)| {
                DeferredAction::new(
                    ActionId::new(message_id as u64, channel_id as u64),
                    delete_time,
                )
            })
            .collect())
    }

    async fn remove(&self, id: &ActionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM deletion_schedule WHERE message_id = $1 AND channel_id = $2")
            .bind(id.message_id as i64)
            .bind(id.channel_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("remove {id}: {e}")))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
