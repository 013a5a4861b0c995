//! Integration tests for the windowed indexing pipeline

mod common;

use async_trait::async_trait;
use common::*;
use forum_search::error::Result;
use forum_search::indexing::{
    ContentEvent, IndexOptions, IndexingError, JobQueue, Window, WorkerQueue,
};
use forum_search::models::{Discussion, Group, Post};
use forum_search::search::{
    BulkResponse, Document, InMemoryEngine, SearchEngine, SearchError, SearchRequest,
    SearchResponse, SearchResult,
};
use forum_search::seeders::{
    ConversionError, DiscussionSeeder, Seeder, SeederOptions, SourceRow,
};
use forum_search::state::{checkpoint_key, CheckpointStore, WindowQuery};
use std::sync::Arc;
use std::time::{Duration, Instant};
use serde_json::Value;
use tokio::sync::Notify;

fn only(content_type: &str) -> IndexOptions {
    IndexOptions {
        only: Some(content_type.to_string()),
        ..IndexOptions::default()
    }
}

#[tokio::test]
async fn test_full_scan_walks_windows_and_clears_checkpoint() {
    let pipeline = Pipeline::new(store_with_discussions(1..=2500), SeederOptions::default());

    let report = pipeline.orchestrator.run(&only("discussions")).await.unwrap();
    let discussions = &report.types[0];

    assert_eq!(
        discussions.windows,
        vec![
            Window { lower: 1500, upper: 2500 },
            Window { lower: 500, upper: 1500 },
            Window { lower: -500, upper: 500 },
        ]
    );
    assert_eq!(discussions.rows, 2500);
    assert_eq!(discussions.jobs_enqueued, 3);
    assert_eq!(pipeline.engine.bulk_sizes(), vec![1000, 1000, 500]);
    assert_eq!(pipeline.engine.len(), 2500);

    let key = checkpoint_key("discussions");
    assert_eq!(
        pipeline.checkpoints.history(&key),
        vec![Some(1500), Some(500), None]
    );
    assert_eq!(pipeline.checkpoints.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_continue_resumes_from_checkpoint() {
    let pipeline = Pipeline::new(store_with_discussions(1..=2500), SeederOptions::default());
    let key = checkpoint_key("discussions");
    pipeline.checkpoints.set(&key, 1200).await.unwrap();

    let options = IndexOptions {
        continue_run: true,
        ..only("discussions")
    };
    let report = pipeline.orchestrator.run(&options).await.unwrap();

    assert_eq!(report.types[0].windows[0], Window { lower: 200, upper: 1200 });
    assert_eq!(report.types[0].rows, 1200);
    assert!(pipeline.engine.get("discussions:1200").is_some());
    assert!(pipeline.engine.get("discussions:1201").is_none());
}

#[tokio::test]
async fn test_continue_without_checkpoint_starts_at_newest_row() {
    let pipeline = Pipeline::new(store_with_discussions(1..=30), SeederOptions::default());
    let options = IndexOptions {
        continue_run: true,
        ..only("discussions")
    };

    let report = pipeline.orchestrator.run(&options).await.unwrap();
    assert_eq!(report.types[0].windows[0].upper, 30);
    assert_eq!(pipeline.engine.len(), 30);
}

#[tokio::test]
async fn test_every_type_is_covered() {
    let store = store_with_discussions([]);
    let mut private = discussion(2, "Private chat");
    private.is_private = true;
    private.recipient_users = vec![forum_search::models::Recipient::new(7)];
    let mut hidden = discussion(3, "Spam");
    hidden.hidden_at = Some(base_time());

    insert_thread(&store, discussion(1, "Welcome"), "Say hello");
    insert_thread(&store, private, "Just us");
    insert_thread(&store, hidden, "Buy now");
    let mut event_post = Post::comment(11, 1, "", base_time());
    event_post.post_type = "discussionRenamed".to_string();
    store.insert_post(event_post);

    let options = SeederOptions {
        private_messaging: true,
        ..SeederOptions::default()
    };
    let pipeline = Pipeline::new(store, options);
    let report = pipeline.orchestrator.run(&IndexOptions::default()).await.unwrap();

    let types: Vec<&str> = report.types.iter().map(|r| r.content_type.as_str()).collect();
    assert_eq!(types, vec!["discussions", "posts"]);
    assert_eq!(report.total_rows(), 5);

    assert!(pipeline.engine.get("discussions:1").is_some());
    assert!(pipeline.engine.get("discussions:3").is_none());
    assert!(pipeline.engine.get("posts:11").is_none());
    // Posts of hidden discussions stay indexed; merging drops them
    assert!(pipeline.engine.get("posts:30").is_some());

    let private_post = pipeline.engine.get("posts:20").unwrap();
    assert!(private_post.is_private);
    assert_eq!(private_post.recipient_users, Some(vec![7]));

    let public_post = pipeline.engine.get("posts:10").unwrap();
    assert_eq!(public_post.content, "Say hello");
    assert_eq!(public_post.groups, vec![Group::GUEST_ID]);
}

#[tokio::test]
async fn test_seed_missing_fills_gaps_only() {
    let pipeline = Pipeline::new(store_with_discussions(1..=1500), SeederOptions::default());
    pipeline.orchestrator.run(&only("discussions")).await.unwrap();

    for id in [17, 800, 1499] {
        pipeline
            .engine
            .delete_document(&Document::document_id("discussions", id))
            .await
            .unwrap();
    }
    let writes_before = pipeline.engine.bulk_sizes().len();

    let options = IndexOptions {
        seed_missing: true,
        ..only("discussions")
    };
    let report = pipeline.orchestrator.run(&options).await.unwrap();

    let mut missing = report.types[0].missing_ids.clone();
    missing.sort_unstable();
    assert_eq!(missing, vec![17, 800, 1499]);
    assert_eq!(pipeline.engine.len(), 1500);
    assert_eq!(
        pipeline.engine.bulk_sizes()[writes_before..].iter().sum::<usize>(),
        3
    );
}

#[tokio::test]
async fn test_missing_detection_failure_aborts_type() {
    let inner = Arc::new(InMemoryEngine::new());
    let engine: Arc<dyn SearchEngine> = Arc::new(UnsearchableEngine {
        inner: inner.clone(),
    });
    let queue: Arc<dyn JobQueue> = Arc::new(forum_search::indexing::InlineQueue::new(engine.clone()));
    let pipeline = Pipeline::with_parts(
        store_with_discussions(1..=10),
        inner,
        engine,
        queue,
        SeederOptions::default(),
    );

    let options = IndexOptions {
        seed_missing: true,
        ..only("discussions")
    };
    let err = pipeline.orchestrator.run(&options).await.unwrap_err();

    assert!(matches!(
        err,
        IndexingError::MissingDetection { ref content_type, .. } if content_type == "discussions"
    ));
    assert!(pipeline.engine.is_empty());
}

#[tokio::test]
async fn test_failed_batch_does_not_stop_scan() {
    let pipeline = Pipeline::new(store_with_discussions(1..=2500), SeederOptions::default());
    pipeline.engine.reject("discussions:2400", "mapper_parsing_exception");

    let report = pipeline.orchestrator.run(&only("discussions")).await.unwrap();

    assert_eq!(report.types[0].windows.len(), 3);
    assert_eq!(report.queue.jobs_failed, 1);
    assert_eq!(report.queue.jobs_completed, 2);
    assert_eq!(report.queue.failures[0].id_range, Some((1501, 2500)));
    assert_eq!(
        pipeline.checkpoints.get(&checkpoint_key("discussions")).await.unwrap(),
        None
    );
    assert_eq!(pipeline.engine.len(), 2499);
}

#[tokio::test]
async fn test_worker_queue_indexes_everything() {
    let store = store_with_discussions(1..=2500);
    let engine = Arc::new(InMemoryEngine::new());
    let queue: Arc<dyn JobQueue> = Arc::new(WorkerQueue::new(engine.clone(), 4, 2));
    let pipeline = Pipeline::with_parts(
        store,
        engine.clone(),
        engine,
        queue,
        SeederOptions::default(),
    );

    let report = pipeline.orchestrator.run(&only("discussions")).await.unwrap();

    assert_eq!(report.queue.jobs_completed, 3);
    assert_eq!(report.queue.documents_submitted, 2500);
    assert_eq!(pipeline.engine.len(), 2500);
}

#[tokio::test]
async fn test_throttle_pauses_between_windows() {
    let pipeline = Pipeline::new(store_with_discussions(1..=2500), SeederOptions::default());
    let options = IndexOptions {
        throttle: Some(Duration::from_millis(25)),
        ..only("discussions")
    };

    let start = Instant::now();
    pipeline.orchestrator.run(&options).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(50));
}

/// Discussion seeder whose first window blocks until released
struct GatedSeeder {
    inner: DiscussionSeeder,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Seeder for GatedSeeder {
    fn content_type(&self) -> &str {
        self.inner.content_type()
    }

    async fn max_id(&self) -> Result<Option<i64>> {
        self.inner.max_id().await
    }

    async fn rows(&self, window: &WindowQuery) -> Result<Vec<SourceRow>> {
        let released = self.release.notified();
        self.entered.notify_one();
        released.await;
        self.inner.rows(window).await
    }

    fn to_document(&self, row: &SourceRow) -> std::result::Result<Document, ConversionError> {
        self.inner.to_document(row)
    }

    fn on_save(&self, event: &ContentEvent) -> Option<SourceRow> {
        self.inner.on_save(event)
    }

    fn on_delete(&self, event: &ContentEvent) -> Option<i64> {
        self.inner.on_delete(event)
    }
}

#[tokio::test]
async fn test_concurrent_run_of_same_type_is_rejected() {
    let store = store_with_discussions(1..=5);
    let pipeline = Pipeline::new(store.clone(), SeederOptions::default());
    let gated = Arc::new(GatedSeeder {
        inner: DiscussionSeeder::new(store.clone(), SeederOptions::default()),
        entered: Notify::new(),
        release: Notify::new(),
    });

    let orchestrator = pipeline.orchestrator.clone();
    let seeder: Arc<dyn Seeder> = gated.clone();
    let first = tokio::spawn(async move {
        orchestrator
            .run_type(seeder, &IndexOptions::default())
            .await
    });
    gated.entered.notified().await;

    let second = pipeline
        .orchestrator
        .run_type(gated.clone(), &IndexOptions::default())
        .await;
    assert!(matches!(second, Err(IndexingError::AlreadyRunning(ref t)) if t == "discussions"));

    let other_type = pipeline
        .orchestrator
        .run(&only("posts"))
        .await
        .unwrap();
    assert_eq!(other_type.types[0].content_type, "posts");

    gated.release.notify_one();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.rows, 5);
}

#[tokio::test]
async fn test_discussion_store_reflects_sticky_option() {
    let store = store_with_discussions([]);
    let mut pinned: Discussion = discussion(1, "Read me first");
    pinned.is_sticky = true;
    store.insert_discussion(pinned);

    let options = SeederOptions {
        sticky: true,
        ..SeederOptions::default()
    };
    let pipeline = Pipeline::new(store, options);
    pipeline.orchestrator.run(&only("discussions")).await.unwrap();

    assert_eq!(pipeline.engine.get("discussions:1").unwrap().is_sticky, Some(true));
}

/// Engine with slow bulk writes whose searches fail for one content type
struct SlowEngine {
    inner: Arc<InMemoryEngine>,
    bulk_delay: Duration,
    unsearchable_type: &'static str,
}

#[async_trait]
impl SearchEngine for SlowEngine {
    async fn bulk_upsert(&self, documents: &[Document], refresh: bool) -> SearchResult<BulkResponse> {
        tokio::time::sleep(self.bulk_delay).await;
        self.inner.bulk_upsert(documents, refresh).await
    }

    async fn delete_document(&self, id: &str) -> SearchResult<()> {
        self.inner.delete_document(id).await
    }

    async fn search(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        let body = request.to_json().to_string();
        if body.contains(&format!("\"{}\"", self.unsearchable_type)) {
            return Err(SearchError::Unreachable("down".to_string()));
        }
        self.inner.search(request).await
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

#[tokio::test]
async fn test_failed_type_still_waits_for_queued_batches() {
    let store = store_with_discussions(1..=1501);
    store.insert_post(Post::comment(20_000, 1, "late reply", base_time()));

    let inner = Arc::new(InMemoryEngine::new());
    let engine: Arc<dyn SearchEngine> = Arc::new(SlowEngine {
        inner: inner.clone(),
        bulk_delay: Duration::from_millis(200),
        unsearchable_type: "posts",
    });
    let queue: Arc<dyn JobQueue> = Arc::new(WorkerQueue::new(engine.clone(), 2, 4));
    let pipeline = Pipeline::with_parts(store, inner, engine, queue, SeederOptions::default());

    let options = IndexOptions {
        seed_missing: true,
        ..IndexOptions::default()
    };
    let err = pipeline.orchestrator.run(&options).await.unwrap_err();

    assert!(matches!(
        err,
        IndexingError::MissingDetection { ref content_type, .. } if content_type == "posts"
    ));
    assert_eq!(
        pipeline.checkpoints.get(&checkpoint_key("discussions")).await.unwrap(),
        None
    );
    assert_eq!(pipeline.engine.len(), 1501);
}
