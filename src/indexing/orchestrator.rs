//! Windowed scan of every content type into the search engine

use crate::indexing::error::{IndexingError, IndexingResult};
use crate::indexing::job::BulkWriteJob;
use crate::indexing::metrics::INDEXING_METRICS;
use crate::indexing::queue::{JobQueue, QueueStats};
use crate::search::{schema, BoolQuery, Query, RangeBounds, SearchEngine, SearchHit, SearchRequest};
use crate::seeders::{Seeder, SeederRegistry};
use crate::state::{checkpoint_key, CheckpointStore, WindowQuery};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Rows covered by one window
pub const DEFAULT_WINDOW_SIZE: i64 = 1000;

/// Flags of one indexing run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexOptions {
    /// Ignore rows above this id
    pub max_id: Option<i64>,

    /// Pause between windows
    pub throttle: Option<Duration>,

    /// Restrict the run to one content type
    pub only: Option<String>,

    /// Drop and create the index before scanning
    pub recreate: bool,

    /// Push the field mapping before scanning
    pub mapping: bool,

    /// Resume from the stored checkpoint
    pub continue_run: bool,

    /// Index only rows absent from the index
    pub seed_missing: bool,

    /// Report rows absent from the index without writing anything
    pub find_missing: bool,
}

impl IndexOptions {
    pub fn detects_missing(&self) -> bool {
        self.seed_missing || self.find_missing
    }
}

/// Id range `(lower, upper]` of a scanned window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Window {
    pub lower: i64,
    pub upper: i64,
}

/// Outcome of scanning one content type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TypeReport {
    pub content_type: String,

    /// Rows loaded across all windows
    pub rows: usize,

    pub windows: Vec<Window>,

    pub jobs_enqueued: usize,

    /// Rows absent from the index, filled when detecting missing documents
    pub missing_ids: Vec<i64>,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub types: Vec<TypeReport>,
    pub queue: QueueStats,
}

impl RunReport {
    pub fn total_rows(&self) -> usize {
        self.types.iter().map(|report| report.rows).sum()
    }
}

/// Drives seeders window by window, newest rows first
pub struct Orchestrator {
    registry: SeederRegistry,
    engine: Arc<dyn SearchEngine>,
    checkpoints: Arc<dyn CheckpointStore>,
    queue: Arc<dyn JobQueue>,
    window_size: i64,
    tokenizer: String,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Orchestrator {
    pub fn new(
        registry: SeederRegistry,
        engine: Arc<dyn SearchEngine>,
        checkpoints: Arc<dyn CheckpointStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            registry,
            engine,
            checkpoints,
            queue,
            window_size: DEFAULT_WINDOW_SIZE,
            tokenizer: "standard".to_string(),
            locks: DashMap::new(),
        }
    }

    pub fn with_window_size(mut self, window_size: i64) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    /// Tokenizer used when the index is recreated
    pub fn with_tokenizer(mut self, tokenizer: impl Into<String>) -> Self {
        self.tokenizer = tokenizer.into();
        self
    }

    pub fn window_size(&self) -> i64 {
        self.window_size
    }

    /// Apply `recreate` and `mapping` before any document is written
    pub async fn prepare_index(&self, options: &IndexOptions) -> IndexingResult<()> {
        if options.recreate {
            info!(tokenizer = %self.tokenizer, "Recreating search index");
            self.engine.delete_index().await?;
            self.engine
                .create_index(schema::index_settings(&self.tokenizer))
                .await?;
        }

        if options.recreate || options.mapping {
            info!("Updating search index mapping");
            self.engine.put_mapping(schema::document_mapping()).await?;
        }

        Ok(())
    }

    /// Scan every selected content type in registration order, then wait
    /// for the queue to finish
    pub async fn run(&self, options: &IndexOptions) -> IndexingResult<RunReport> {
        let seeders = self.registry.only(options.only.as_deref())?;
        self.prepare_index(options).await?;

        let mut report = RunReport::default();
        let mut failure = None;
        for seeder in seeders {
            match self.run_type(seeder, options).await {
                Ok(type_report) => report.types.push(type_report),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        // Jobs of types scanned before a failure still have to land
        report.queue = self.queue.drain().await;

        if let Some(e) = failure {
            error!(
                error = %e,
                jobs_completed = report.queue.jobs_completed,
                jobs_failed = report.queue.jobs_failed,
                "Indexing run aborted"
            );
            return Err(e);
        }

        info!(
            total_rows = report.total_rows(),
            jobs_completed = report.queue.jobs_completed,
            jobs_failed = report.queue.jobs_failed,
            "Indexing run finished"
        );

        Ok(report)
    }

    /// Scan a single content type
    pub async fn run_type(
        &self,
        seeder: Arc<dyn Seeder>,
        options: &IndexOptions,
    ) -> IndexingResult<TypeReport> {
        let content_type = seeder.content_type().to_string();
        let lock = self.locks.entry(content_type.clone()).or_default().clone();
        let _guard = lock
            .try_lock_owned()
            .map_err(|_| IndexingError::AlreadyRunning(content_type.clone()))?;

        let key = checkpoint_key(&content_type);
        let mut report = TypeReport {
            content_type: content_type.clone(),
            ..TypeReport::default()
        };

        let mut cursor = self.start_cursor(seeder.as_ref(), &key, options).await?;
        info!(content_type = %content_type, cursor = ?cursor, "Indexing content type");

        while let Some(upper) = cursor {
            let lower = upper - self.window_size;
            let window = Window { lower, upper };

            let exclude = if options.detects_missing() {
                self.indexed_ids(&content_type, window).await?
            } else {
                HashSet::new()
            };

            let query = WindowQuery::new(lower, upper)
                .with_max_id(options.max_id)
                .with_exclude(exclude);
            let rows = seeder.rows(&query).await?;

            INDEXING_METRICS.record_window(&content_type, rows.len());
            report.windows.push(window);
            report.rows += rows.len();

            match rows.iter().map(|row| row.id()).min() {
                Some(min_id) => {
                    cursor = Some(min_id - 1).filter(|next| *next > 0);

                    if options.detects_missing() {
                        report.missing_ids.extend(rows.iter().map(|row| row.id()));
                    }

                    if options.find_missing {
                        info!(
                            content_type = %content_type,
                            lower,
                            upper,
                            missing = rows.len(),
                            "Found rows missing from the index"
                        );
                    } else {
                        debug!(content_type = %content_type, lower, upper, rows = rows.len(), "Enqueueing window");
                        self.queue.push(BulkWriteJob::new(seeder.clone(), rows)).await?;
                        report.jobs_enqueued += 1;
                    }
                }
                None => {
                    cursor = Some(upper - self.window_size).filter(|next| *next > 0);
                }
            }

            self.checkpoints.store(&key, cursor).await?;

            if let (Some(throttle), Some(_)) = (options.throttle, cursor) {
                tokio::time::sleep(throttle).await;
            }
        }

        info!(
            content_type = %content_type,
            amount = report.rows,
            windows = report.windows.len(),
            jobs = report.jobs_enqueued,
            "Finished indexing content type"
        );

        Ok(report)
    }

    async fn start_cursor(
        &self,
        seeder: &dyn Seeder,
        key: &str,
        options: &IndexOptions,
    ) -> IndexingResult<Option<i64>> {
        if options.continue_run {
            match self.checkpoints.get(key).await? {
                Some(cursor) => return Ok(Some(cursor)),
                None => warn!(key, "No checkpoint stored, starting from the newest row"),
            }
        }

        let max_id = seeder.max_id().await?;
        Ok(match (max_id, options.max_id) {
            (Some(max_id), Some(cap)) => Some(max_id.min(cap)),
            (max_id, _) => max_id,
        })
    }

    /// Raw ids of this type already present in the index within the window
    async fn indexed_ids(&self, content_type: &str, window: Window) -> IndexingResult<HashSet<i64>> {
        let query = BoolQuery::new()
            .filter(Query::term("type", content_type))
            .filter(Query::range(
                "rawId",
                RangeBounds {
                    gt: Some(window.lower as f64),
                    lte: Some(window.upper as f64),
                    ..RangeBounds::default()
                },
            ));
        let request = SearchRequest::new(Query::Bool(query)).with_size(self.window_size as usize);

        let response = self
            .engine
            .search(&request)
            .await
            .map_err(|source| IndexingError::MissingDetection {
                content_type: content_type.to_string(),
                source,
            })?;

        Ok(response
            .hits()
            .iter()
            .filter_map(SearchHit::from_raw)
            .map(|hit| hit.raw_id)
            .collect())
    }
}
