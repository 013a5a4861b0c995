//! Error types for the indexing pipeline

use crate::error::AppError;
use crate::search::{BulkItem, SearchError};

/// Result type for indexing operations
pub type IndexingResult<T> = std::result::Result<T, IndexingError>;

/// Errors raised while scanning and writing documents
#[derive(Debug, thiserror::Error)]
pub enum IndexingError {
    /// The engine rejected items of a bulk request
    #[error("Failed to seed: {reason}")]
    SeedingFailed { reason: String, items: Vec<BulkItem> },

    /// Looking up already indexed ids failed; the type's run stops
    #[error("Missing-document detection failed for {content_type}: {source}")]
    MissingDetection {
        content_type: String,
        #[source]
        source: SearchError,
    },

    /// A scan of this content type is already running
    #[error("Indexing of {0} is already running")]
    AlreadyRunning(String),

    /// The job queue no longer accepts jobs
    #[error("Job queue closed")]
    QueueClosed,

    #[error(transparent)]
    Engine(#[from] SearchError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl IndexingError {
    /// Number of rejected items carried by a seeding failure
    pub fn failed_items(&self) -> usize {
        match self {
            IndexingError::SeedingFailed { items, .. } => items
                .iter()
                .filter(|item| item.index.error.is_some())
                .count(),
            _ => 0,
        }
    }
}

impl From<IndexingError> for AppError {
    fn from(err: IndexingError) -> Self {
        match err {
            IndexingError::AlreadyRunning(content_type) => {
                AppError::Conflict(format!("Indexing of {} is already running", content_type))
            }
            IndexingError::Engine(err) => err.into(),
            IndexingError::App(err) => err,
            other => AppError::Indexing(other.to_string()),
        }
    }
}
