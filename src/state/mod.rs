//! Storage seams of the pipeline
//!
//! `ForumStore` is the read side over the relational forum data the
//! seeders and the result merger consume. `CheckpointStore` persists scan
//! progress per content type between runs.

pub mod checkpoint;
pub mod factory;
pub mod redis_store;
pub mod sled_store;
pub mod snapshot;
pub mod store;

pub use checkpoint::InMemoryCheckpointStore;
pub use factory::{create_checkpoint_store, create_in_memory_checkpoint_store};
pub use redis_store::RedisCheckpointStore;
pub use sled_store::SledCheckpointStore;
pub use snapshot::ForumSnapshot;
pub use store::InMemoryForumStore;

use crate::error::Result;
use crate::models::{CommentRow, Discussion, Post};
use async_trait::async_trait;
use std::collections::HashSet;

/// Prefix of every checkpoint key
pub const CHECKPOINT_PREFIX: &str = "forum-search.continued-at";

/// Checkpoint key of one content type
pub fn checkpoint_key(content_type: &str) -> String {
    format!("{}.{}", CHECKPOINT_PREFIX, content_type)
}

/// Row selection for one scan window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowQuery {
    /// Inclusive upper id
    pub upper: i64,

    /// Exclusive lower id
    pub lower: i64,

    /// Global id cap of the run
    pub max_id: Option<i64>,

    /// Ids already present in the index
    pub exclude: HashSet<i64>,
}

impl WindowQuery {
    pub fn new(lower: i64, upper: i64) -> Self {
        Self {
            upper,
            lower,
            max_id: None,
            exclude: HashSet::new(),
        }
    }

    pub fn with_max_id(mut self, max_id: Option<i64>) -> Self {
        self.max_id = max_id;
        self
    }

    pub fn with_exclude(mut self, exclude: HashSet<i64>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Whether a row id falls inside this selection
    pub fn accepts(&self, id: i64) -> bool {
        id > self.lower
            && id <= self.upper
            && self.max_id.map_or(true, |max| id <= max)
            && !self.exclude.contains(&id)
    }
}

/// Read access to forum rows
#[async_trait]
pub trait ForumStore: Send + Sync {
    /// Highest discussion id, hidden ones included
    async fn max_discussion_id(&self) -> Result<Option<i64>>;

    /// Highest post id of comment type
    async fn max_comment_id(&self) -> Result<Option<i64>>;

    /// Visible discussions inside the window, newest id first
    async fn discussions_in_window(&self, window: &WindowQuery) -> Result<Vec<Discussion>>;

    /// Visible comment posts inside the window joined with their
    /// discussion, newest id first
    async fn comments_in_window(&self, window: &WindowQuery) -> Result<Vec<CommentRow>>;

    /// Distinct discussions with one of `discussion_ids` or owning one of
    /// `post_ids`. Hidden discussions are left out unless `include_hidden`.
    async fn discussions_matching(
        &self,
        discussion_ids: &[i64],
        post_ids: &[i64],
        include_hidden: bool,
    ) -> Result<Vec<Discussion>>;

    /// Lowest-id post of the discussion among `post_ids`
    async fn first_post_among(&self, discussion_id: i64, post_ids: &[i64]) -> Result<Option<Post>>;

    async fn posts_by_ids(&self, ids: &[i64]) -> Result<Vec<Post>>;

    async fn tag_id_for_slug(&self, slug: &str) -> Result<Option<i64>>;
}

/// Durable "resume at" cursor per content type
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<i64>>;

    async fn set(&self, key: &str, value: i64) -> Result<()>;

    async fn clear(&self, key: &str) -> Result<()>;

    /// Persist a cursor, clearing the key once the scan is complete
    async fn store(&self, key: &str, value: Option<i64>) -> Result<()> {
        match value {
            Some(value) => self.set(key, value).await,
            None => self.clear(key).await,
        }
    }
}
