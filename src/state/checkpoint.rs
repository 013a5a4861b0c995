use crate::error::Result;
use crate::state::CheckpointStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local checkpoints, lost on exit
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    values: Arc<DashMap<String, i64>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.values.get(key).map(|entry| *entry))
    }

    async fn set(&self, key: &str, value: i64) -> Result<()> {
        self.values.insert(key.to_string(), value);
        tracing::debug!(key = %key, value, "Checkpoint saved");
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        self.values.remove(key);
        tracing::debug!(key = %key, "Checkpoint cleared");
        Ok(())
    }
}
