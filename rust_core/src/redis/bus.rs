use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Shared Redis command connection plus the client used for PubSub.
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
    connection: ConnectionManager,
}

impl RedisBus {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("Invalid REDIS_URL")?;
        let connection = ConnectionManager::new(client.clone())
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self { client, connection })
    }

    pub async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        conn.hget(key, field)
            .await
            .with_context(|| format!("HGET {} {} failed", key, field))
    }

    pub async fn hash_all(&self, key: &str) -> Result<Vec<(String, String)>> {
        let mut conn = self.connection.clone();
        conn.hgetall(key)
            .await
            .with_context(|| format!("HGETALL {} failed", key))
    }

    pub async fn hash_values(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        conn.hvals(key)
            .await
            .with_context(|| format!("HVALS {} failed", key))
    }

    pub fn get_client(&self) -> Client {
        self.client.clone()
    }
}
