use crate::config::{StateBackend, StateConfig};
use crate::error::{AppError, Result};
use crate::state::{
    CheckpointStore, InMemoryCheckpointStore, RedisCheckpointStore, SledCheckpointStore,
};
use std::sync::Arc;

/// Create the checkpoint store selected by configuration
pub async fn create_checkpoint_store(config: &StateConfig) -> Result<Arc<dyn CheckpointStore>> {
    match config.backend {
        StateBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing Sled checkpoint backend");

            let store = SledCheckpointStore::new(path)?;
            Ok(Arc::new(store))
        }

        StateBackend::Redis => {
            let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                AppError::Configuration(
                    "Redis backend requires 'redis_url' configuration".to_string(),
                )
            })?;

            tracing::info!(url = %redis_url, "Initializing Redis checkpoint backend");

            let store =
                RedisCheckpointStore::with_prefix(redis_url, config.key_prefix.as_deref()).await?;
            Ok(Arc::new(store))
        }

        StateBackend::Memory => {
            tracing::warn!("Checkpoints are kept in memory and lost on exit");
            Ok(create_in_memory_checkpoint_store())
        }
    }
}

/// Create an in-memory checkpoint store (for testing and development)
pub fn create_in_memory_checkpoint_store() -> Arc<dyn CheckpointStore> {
    tracing::info!("Initializing in-memory checkpoint backend");
    Arc::new(InMemoryCheckpointStore::new())
}
