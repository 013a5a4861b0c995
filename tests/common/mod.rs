//! Common fixtures for the integration tests
//!
//! Builds small forums in an `InMemoryForumStore` and wires the indexing
//! pipeline against an `InMemoryEngine`.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use forum_search::error::Result;
use forum_search::indexing::{InlineQueue, JobQueue, Orchestrator};
use forum_search::models::{Discussion, Post};
use forum_search::search::{
    BulkResponse, Document, InMemoryEngine, SearchEngine, SearchError, SearchRequest,
    SearchResponse, SearchResult,
};
use forum_search::seeders::{SeederOptions, SeederRegistry};
use forum_search::state::{CheckpointStore, InMemoryCheckpointStore, InMemoryForumStore};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Fixed reference time so orderings are deterministic
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// A public discussion with a first post of the same id times ten
pub fn discussion(id: i64, title: &str) -> Discussion {
    let mut discussion = Discussion::new(id, title, base_time() + Duration::hours(id));
    discussion.first_post_id = Some(id * 10);
    discussion.last_post_id = Some(id * 10);
    discussion.comment_count = 1;
    discussion
}

/// Store holding bare discussions with the given ids
pub fn store_with_discussions(ids: impl IntoIterator<Item = i64>) -> Arc<InMemoryForumStore> {
    let store = InMemoryForumStore::new();
    for id in ids {
        store.insert_discussion(discussion(id, &format!("Discussion {}", id)));
    }
    Arc::new(store)
}

/// Insert a discussion together with its opening post
pub fn insert_thread(store: &InMemoryForumStore, discussion: Discussion, body: &str) {
    let first_post_id = discussion.first_post_id.unwrap_or(discussion.id * 10);
    store.insert_post(Post::comment(
        first_post_id,
        discussion.id,
        body,
        discussion.created_at,
    ));
    store.insert_discussion(discussion);
}

/// Indexing pipeline over in-memory parts
pub struct Pipeline {
    pub store: Arc<InMemoryForumStore>,
    pub engine: Arc<InMemoryEngine>,
    pub checkpoints: Arc<RecordingCheckpointStore>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Pipeline {
    pub fn new(store: Arc<InMemoryForumStore>, options: SeederOptions) -> Self {
        let engine = Arc::new(InMemoryEngine::new());
        let queue: Arc<dyn JobQueue> = Arc::new(InlineQueue::new(engine.clone()));
        Self::with_parts(store, engine.clone(), engine, queue, options)
    }

    pub fn with_parts(
        store: Arc<InMemoryForumStore>,
        engine: Arc<InMemoryEngine>,
        search_engine: Arc<dyn SearchEngine>,
        queue: Arc<dyn JobQueue>,
        options: SeederOptions,
    ) -> Self {
        let checkpoints = Arc::new(RecordingCheckpointStore::default());
        let registry = SeederRegistry::forum(store.clone(), options);
        let orchestrator = Arc::new(Orchestrator::new(
            registry,
            search_engine,
            checkpoints.clone(),
            queue,
        ));
        Self {
            store,
            engine,
            checkpoints,
            orchestrator,
        }
    }
}

/// Checkpoint store that remembers every value written
#[derive(Default)]
pub struct RecordingCheckpointStore {
    inner: InMemoryCheckpointStore,
    history: Mutex<Vec<(String, Option<i64>)>>,
}

impl RecordingCheckpointStore {
    pub fn history(&self, key: &str) -> Vec<Option<i64>> {
        self.history
            .lock()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, value)| *value)
            .collect()
    }
}

#[async_trait]
impl CheckpointStore for RecordingCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<i64>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: i64) -> Result<()> {
        self.history.lock().push((key.to_string(), Some(value)));
        self.inner.set(key, value).await
    }

    async fn clear(&self, key: &str) -> Result<()> {
        self.history.lock().push((key.to_string(), None));
        self.inner.clear(key).await
    }
}

/// Engine whose searches always fail while writes go through
pub struct UnsearchableEngine {
    pub inner: Arc<InMemoryEngine>,
}

#[async_trait]
impl SearchEngine for UnsearchableEngine {
    async fn bulk_upsert(&self, documents: &[Document], refresh: bool) -> SearchResult<BulkResponse> {
        self.inner.bulk_upsert(documents, refresh).await
    }

    async fn delete_document(&self, id: &str) -> SearchResult<()> {
        self.inner.delete_document(id).await
    }

    async fn search(&self, _request: &SearchRequest) -> SearchResult<SearchResponse> {
        Err(SearchError::Unreachable("connection refused".to_string()))
    }

    async fn delete_index(&self) -> SearchResult<()> {
        self.inner.delete_index().await
    }

    async fn create_index(&self, settings: Value) -> SearchResult<()> {
        self.inner.create_index(settings).await
    }

    async fn put_mapping(&self, mapping: Value) -> SearchResult<()> {
        self.inner.put_mapping(mapping).await
    }
}
