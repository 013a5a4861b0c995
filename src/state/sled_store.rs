use crate::error::{AppError, Result};
use crate::state::CheckpointStore;
use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Persistent checkpoint store using the Sled embedded database
#[derive(Clone)]
pub struct SledCheckpointStore {
    db: Arc<Db>,
    tree: sled::Tree,
}

impl SledCheckpointStore {
    /// Open (or create) the store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)
            .map_err(|e| AppError::Internal(format!("Failed to open Sled database: {}", e)))?;

        let tree = db
            .open_tree("checkpoints")
            .map_err(|e| AppError::Internal(format!("Failed to open checkpoints tree: {}", e)))?;

        tracing::info!("Initialized Sled checkpoint store at {:?}", path_ref);

        Ok(Self {
            db: Arc::new(db),
            tree,
        })
    }

    fn decode(bytes: &[u8]) -> Result<i64> {
        let raw: [u8; 8] = bytes.try_into().map_err(|_| {
            AppError::Internal(format!(
                "Corrupt checkpoint value of {} bytes",
                bytes.len()
            ))
        })?;
        Ok(i64::from_be_bytes(raw))
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to flush Sled database: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SledCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<i64>> {
        let value = self
            .tree
            .get(key.as_bytes())
            .map_err(|e| AppError::Internal(format!("Failed to read checkpoint: {}", e)))?;

        value.map(|bytes| Self::decode(&bytes)).transpose()
    }

    async fn set(&self, key: &str, value: i64) -> Result<()> {
        self.tree
            .insert(key.as_bytes(), value.to_be_bytes().to_vec())
            .map_err(|e| AppError::Internal(format!("Failed to write checkpoint: {}", e)))?;
        self.flush().await?;

        tracing::debug!(key = %key, value, "Checkpoint saved");
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        self.tree
            .remove(key.as_bytes())
            .map_err(|e| AppError::Internal(format!("Failed to clear checkpoint: {}", e)))?;
        self.flush().await?;

        tracing::debug!(key = %key, "Checkpoint cleared");
        Ok(())
    }
}
