//! SQLite-backed record of handled (channel, message) pairs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::retry::execute_with_retry;
use super::ProcessedMessageStore;
use crate::models::ProcessedMessageRecord;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS processed_messages (
    channel_id INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    processed_at TEXT NOT NULL,
    PRIMARY KEY (channel_id, message_id)
)";

#[derive(Clone)]
pub struct SqliteProcessedStore {
    pool: SqlitePool,
}

impl SqliteProcessedStore {
    /// Wrap a pool and make sure the table exists.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .context("Failed to create processed_messages table")?;
        Ok(Self { pool })
    }

    /// The stored marker, if this message was handled before.
    pub async fn get(&self, channel_id: i64, message_id: i64) -> Result<Option<ProcessedMessageRecord>> {
        let row = execute_with_retry(
            || async {
                sqlx::query_as::<_, (i64, i64, chrono::DateTime<Utc>)>(
                    "SELECT channel_id, message_id, processed_at FROM processed_messages
                     WHERE channel_id = ? AND message_id = ?",
                )
                .bind(channel_id)
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to query processed_messages")
            },
            3,
        )
        .await?;

        Ok(row.map(|(channel_id, message_id, processed_at)| ProcessedMessageRecord {
            channel_id,
            message_id,
            processed_at,
        }))
    }
}

#[async_trait]
impl ProcessedMessageStore for SqliteProcessedStore {
    async fn has(&self, channel_id: i64, message_id: i64) -> Result<bool> {
        Ok(self.get(channel_id, message_id).await?.is_some())
    }

    async fn add(&self, channel_id: i64, message_id: i64) -> Result<()> {
        execute_with_retry(
            || async {
                sqlx::query(
                    "INSERT OR IGNORE INTO processed_messages (channel_id, message_id, processed_at)
                     VALUES (?, ?, ?)",
                )
                .bind(channel_id)
                .bind(message_id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .context("Failed to insert into processed_messages")?;
                Ok(())
            },
            3,
        )
        .await
    }
}
