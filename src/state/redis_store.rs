use crate::error::{AppError, Result};
use crate::state::CheckpointStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-backed checkpoint store, shared by every host running the indexer
#[derive(Clone)]
pub struct RedisCheckpointStore {
    connection: ConnectionManager,
    key_prefix: Option<String>,
}

impl RedisCheckpointStore {
    pub async fn new(redis_url: &str) -> Result<Self> {
        Self::with_prefix(redis_url, None).await
    }

    /// Create a store namespacing every key under `prefix`
    pub async fn with_prefix(redis_url: &str, prefix: Option<&str>) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut test_conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        tracing::info!(prefix = ?prefix, "Initialized Redis checkpoint store");

        Ok(Self {
            connection,
            key_prefix: prefix.map(str::to_string),
        })
    }

    fn key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl CheckpointStore for RedisCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<i64>> {
        let mut conn = self.connection.clone();
        conn.get(self.key(key))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read checkpoint: {}", e)))
    }

    async fn set(&self, key: &str, value: i64) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(self.key(key), value)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write checkpoint: {}", e)))?;
        tracing::debug!(key = %key, value, "Checkpoint saved");
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(self.key(key))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to clear checkpoint: {}", e)))?;
        tracing::debug!(key = %key, "Checkpoint cleared");
        Ok(())
    }
}
