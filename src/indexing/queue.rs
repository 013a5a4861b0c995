//! Task queue executing bulk write jobs
//!
//! `push` is fire-and-forget: a failing job is logged with its content type
//! and id range, counted, and never retried. Re-running the indexer with
//! `--continue` or `--seed-missing` is the recovery path.

use crate::indexing::error::{IndexingError, IndexingResult};
use crate::indexing::job::{BulkOutcome, BulkWriteJob};
use crate::search::SearchEngine;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex as SyncMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A job that did not make it into the index
#[derive(Debug, Clone, PartialEq)]
pub struct JobFailure {
    pub content_type: String,
    pub id_range: Option<(i64, i64)>,
    pub error: String,
}

/// Counters over every job a queue ran
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStats {
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub documents_submitted: usize,
    pub rows_skipped: usize,
    pub failures: Vec<JobFailure>,
}

/// Consumer of bulk write jobs
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submit a job without waiting for it to run
    async fn push(&self, job: BulkWriteJob) -> IndexingResult<()>;

    /// Wait until every pushed job finished and report totals
    async fn drain(&self) -> QueueStats;
}

#[derive(Default)]
struct QueueState {
    pending: AtomicUsize,
    idle: Notify,
    stats: SyncMutex<QueueStats>,
}

impl QueueState {
    fn record(&self, job: &BulkWriteJob, result: IndexingResult<BulkOutcome>, worker_id: usize) {
        let mut stats = self.stats.lock();
        match result {
            Ok(outcome) => {
                stats.jobs_completed += 1;
                stats.documents_submitted += outcome.submitted;
                stats.rows_skipped += outcome.skipped;
            }
            Err(e) => {
                let id_range = job.id_range();
                error!(
                    job_id = %job.job_id,
                    worker_id,
                    content_type = %job.content_type(),
                    id_range = ?id_range,
                    failed_items = e.failed_items(),
                    error = %e,
                    "Bulk write job failed"
                );
                stats.jobs_failed += 1;
                stats.failures.push(JobFailure {
                    content_type: job.content_type().to_string(),
                    id_range,
                    error: e.to_string(),
                });
            }
        }
    }

    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn wait_idle(&self) -> QueueStats {
        loop {
            let notified = self.idle.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            notified.await;
        }
        self.stats.lock().clone()
    }
}

/// Bounded channel consumed by a pool of tokio workers
pub struct WorkerQueue {
    sender: mpsc::Sender<BulkWriteJob>,
    state: Arc<QueueState>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerQueue {
    /// Start `workers` tasks sharing one receiver
    pub fn new(engine: Arc<dyn SearchEngine>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let state = Arc::new(QueueState::default());

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                Self::spawn_worker(worker_id, receiver.clone(), engine.clone(), state.clone())
            })
            .collect();

        info!(workers = workers.max(1), capacity, "Bulk write queue started");

        Self {
            sender,
            state,
            workers: handles,
        }
    }

    fn spawn_worker(
        worker_id: usize,
        receiver: Arc<Mutex<mpsc::Receiver<BulkWriteJob>>>,
        engine: Arc<dyn SearchEngine>,
        state: Arc<QueueState>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(worker_id, "Bulk write worker started");

            loop {
                let job = receiver.lock().await.recv().await;
                let Some(job) = job else { break };

                let result = job.execute(engine.as_ref()).await;
                state.record(&job, result, worker_id);
                state.finish_one();
            }

            info!(worker_id, "Bulk write worker stopped");
        })
    }

    /// Close the queue and wait for the workers to exit
    pub async fn shutdown(self) -> QueueStats {
        let stats = self.state.wait_idle().await;
        drop(self.sender);
        for result in join_all(self.workers).await {
            if let Err(e) = result {
                error!(error = %e, "Bulk write worker panicked");
            }
        }
        stats
    }
}

#[async_trait]
impl JobQueue for WorkerQueue {
    async fn push(&self, job: BulkWriteJob) -> IndexingResult<()> {
        self.state.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(job).await.is_err() {
            self.state.finish_one();
            return Err(IndexingError::QueueClosed);
        }
        Ok(())
    }

    async fn drain(&self) -> QueueStats {
        self.state.wait_idle().await
    }
}

/// Runs every job inside `push`
pub struct InlineQueue {
    engine: Arc<dyn SearchEngine>,
    state: QueueState,
}

impl InlineQueue {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            engine,
            state: QueueState::default(),
        }
    }
}

#[async_trait]
impl JobQueue for InlineQueue {
    async fn push(&self, job: BulkWriteJob) -> IndexingResult<()> {
        let result = job.execute(self.engine.as_ref()).await;
        self.state.record(&job, result, 0);
        Ok(())
    }

    async fn drain(&self) -> QueueStats {
        self.state.stats.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Discussion;
    use crate::search::InMemoryEngine;
    use crate::seeders::{DiscussionSeeder, Seeder, SeederOptions, SourceRow};
    use crate::state::InMemoryForumStore;
    use chrono::Utc;

    fn job(ids: std::ops::RangeInclusive<i64>) -> BulkWriteJob {
        let seeder: Arc<dyn Seeder> = Arc::new(DiscussionSeeder::new(
            Arc::new(InMemoryForumStore::new()),
            SeederOptions::default(),
        ));
        let rows = ids
            .map(|id| SourceRow::Discussion(Discussion::new(id, format!("d{}", id), Utc::now())))
            .collect();
        BulkWriteJob::new(seeder, rows)
    }

    #[tokio::test]
    async fn test_workers_process_all_jobs() {
        let engine = Arc::new(InMemoryEngine::new());
        let queue = WorkerQueue::new(engine.clone(), 3, 2);

        for start in (1..=50).step_by(10) {
            queue.push(job(start..=start + 9)).await.unwrap();
        }

        let stats = queue.drain().await;
        assert_eq!(stats.jobs_completed, 5);
        assert_eq!(stats.documents_submitted, 50);
        assert_eq!(engine.len(), 50);

        let stats = queue.shutdown().await;
        assert_eq!(stats.jobs_failed, 0);
    }

    #[tokio::test]
    async fn test_failures_are_recorded_not_raised() {
        let engine = Arc::new(InMemoryEngine::new());
        engine.reject("discussions:3", "boom");
        let queue = InlineQueue::new(engine.clone());

        queue.push(job(1..=5)).await.unwrap();
        queue.push(job(6..=8)).await.unwrap();

        let stats = queue.drain().await;
        assert_eq!(stats.jobs_completed, 1);
        assert_eq!(stats.jobs_failed, 1);
        assert_eq!(
            stats.failures[0],
            JobFailure {
                content_type: "discussions".to_string(),
                id_range: Some((1, 5)),
                error: "Failed to seed: boom".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_drain_on_idle_queue_returns_immediately() {
        let queue = WorkerQueue::new(Arc::new(InMemoryEngine::new()), 1, 1);
        assert_eq!(queue.drain().await, QueueStats::default());
    }
}
