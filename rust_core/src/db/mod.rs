//! Local stores: the processed-message dedup store and shared retry logic.

pub mod pool;
pub mod processed;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

pub use pool::{create_pool, DbPoolConfig};
pub use processed::SqliteProcessedStore;
pub use retry::{execute_with_retry, execute_with_retry_custom, execute_with_retry_when};

/// Insert-once marker store keyed by (channel id, message id).
#[async_trait]
pub trait ProcessedMessageStore: Send + Sync {
    async fn has(&self, channel_id: i64, message_id: i64) -> Result<bool>;
    async fn add(&self, channel_id: i64, message_id: i64) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryProcessedStore {
    seen: Mutex<HashSet<(i64, i64)>>,
}

impl MemoryProcessedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }
}

#[async_trait]
impl ProcessedMessageStore for MemoryProcessedStore {
    async fn has(&self, channel_id: i64, message_id: i64) -> Result<bool> {
        Ok(self.seen.lock().await.contains(&(channel_id, message_id)))
    }

    async fn add(&self, channel_id: i64, message_id: i64) -> Result<()> {
        self.seen.lock().await.insert((channel_id, message_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_is_insert_once() {
        let store = MemoryProcessedStore::new();
        store.add(1, 2).await.unwrap();
        store.add(1, 2).await.unwrap();
        assert!(store.has(1, 2).await.unwrap());
        assert!(!store.has(2, 1).await.unwrap());
        assert_eq!(store.len().await, 1);
    }
}
