//! Search index synchronisation
//!
//! Two paths keep the index in step with the forum:
//!
//! - **Bulk scan**: the [`Orchestrator`] walks every content type from the
//!   newest id down in fixed-size windows, enqueueing one [`BulkWriteJob`]
//!   per window and persisting a checkpoint after each, so an interrupted
//!   run can resume with `--continue`.
//! - **Change sync**: [`ChangeSync`] reacts to single [`ContentEvent`]s by
//!   upserting or deleting the affected document.

mod error;
mod events;
mod job;
pub mod metrics;
mod orchestrator;
mod queue;
mod sync;

pub use error::{IndexingError, IndexingResult};
pub use events::ContentEvent;
pub use job::{BulkOutcome, BulkWriteJob};
pub use metrics::{gather_metrics, INDEXING_METRICS};
pub use orchestrator::{
    IndexOptions, Orchestrator, RunReport, TypeReport, Window, DEFAULT_WINDOW_SIZE,
};
pub use queue::{InlineQueue, JobFailure, JobQueue, QueueStats, WorkerQueue};
pub use sync::{ChangeSync, ContentEventSender, SyncOutcome};
