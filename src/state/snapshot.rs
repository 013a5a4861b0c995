use crate::error::{AppError, Result};
use crate::models::{Discussion, Post};
use crate::state::InMemoryForumStore;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A tag as exported from the forum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagRef {
    pub id: i64,
    pub slug: String,
}

/// JSON export of the forum tables the pipeline reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForumSnapshot {
    #[serde(default)]
    pub discussions: Vec<Discussion>,

    #[serde(default)]
    pub posts: Vec<Post>,

    #[serde(default)]
    pub tags: Vec<TagRef>,
}

impl ForumSnapshot {
    /// Read a snapshot file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Database(format!("Failed to read snapshot {:?}: {}", path, e))
        })?;
        let snapshot: Self = serde_json::from_str(&raw)?;

        tracing::info!(
            path = ?path,
            discussions = snapshot.discussions.len(),
            posts = snapshot.posts.len(),
            tags = snapshot.tags.len(),
            "Loaded forum snapshot"
        );

        Ok(snapshot)
    }

    /// Build a queryable store from the snapshot
    pub fn into_store(self) -> InMemoryForumStore {
        let store = InMemoryForumStore::new();
        for discussion in self.discussions {
            store.insert_discussion(discussion);
        }
        for post in self.posts {
            store.insert_post(post);
        }
        for tag in self.tags {
            store.insert_tag(tag.slug, tag.id);
        }
        store
    }
}
