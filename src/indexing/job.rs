//! One window's worth of rows on its way into the search engine

use crate::indexing::error::{IndexingError, IndexingResult};
use crate::indexing::metrics::INDEXING_METRICS;
use crate::search::{Document, SearchEngine};
use crate::seeders::{Seeder, SourceRow};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// What a bulk job sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Documents included in the bulk request
    pub submitted: usize,

    /// Rows dropped because they failed conversion
    pub skipped: usize,
}

/// Converts a batch of rows and upserts them in a single bulk request
#[derive(Clone)]
pub struct BulkWriteJob {
    pub job_id: Uuid,
    pub seeder: Arc<dyn Seeder>,
    pub rows: Vec<SourceRow>,
}

impl std::fmt::Debug for BulkWriteJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkWriteJob")
            .field("job_id", &self.job_id)
            .field("content_type", &self.seeder.content_type())
            .field("rows", &self.rows.len())
            .finish()
    }
}

impl BulkWriteJob {
    pub fn new(seeder: Arc<dyn Seeder>, rows: Vec<SourceRow>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            seeder,
            rows,
        }
    }

    pub fn content_type(&self) -> &str {
        self.seeder.content_type()
    }

    /// Lowest and highest row id in the batch
    pub fn id_range(&self) -> Option<(i64, i64)> {
        let ids = self.rows.iter().map(SourceRow::id);
        Some((ids.clone().min()?, ids.max()?))
    }

    /// Convert the rows, dropping the ones that fail
    pub fn documents(&self) -> (Vec<Document>, usize) {
        let mut documents = Vec::with_capacity(self.rows.len());
        let mut skipped = 0;
        for row in &self.rows {
            match self.seeder.to_document(row) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    skipped += 1;
                    INDEXING_METRICS.record_conversion_failure(self.content_type());
                    debug!(
                        content_type = %self.content_type(),
                        row_id = row.id(),
                        error = %e,
                        "Skipping row that failed conversion"
                    );
                }
            }
        }
        (documents, skipped)
    }

    /// Upsert the batch with a synchronous refresh
    pub async fn execute(&self, engine: &dyn SearchEngine) -> IndexingResult<BulkOutcome> {
        let (documents, skipped) = self.documents();
        if documents.is_empty() {
            return Ok(BulkOutcome {
                submitted: 0,
                skipped,
            });
        }

        let start = Instant::now();
        let result = engine.bulk_upsert(&documents, true).await;
        let elapsed = start.elapsed().as_secs_f64();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                INDEXING_METRICS.record_bulk(self.content_type(), 0, false, elapsed);
                return Err(e.into());
            }
        };

        let failed = response.failed_count();
        INDEXING_METRICS.record_bulk(
            self.content_type(),
            documents.len() - failed,
            !response.errors,
            elapsed,
        );

        if response.errors {
            let reason = response
                .first_error()
                .and_then(|item| item.error.as_ref())
                .map(|error| error.reason.clone())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(IndexingError::SeedingFailed {
                reason,
                items: response.items,
            });
        }

        info!(
            job_id = %self.job_id,
            content_type = %self.content_type(),
            submitted = documents.len(),
            skipped,
            "Bulk write completed"
        );

        Ok(BulkOutcome {
            submitted: documents.len(),
            skipped,
        })
    }
}
