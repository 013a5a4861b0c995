//! Keeps single documents in step with forum changes

use crate::indexing::error::{IndexingError, IndexingResult};
use crate::indexing::events::ContentEvent;
use crate::search::{Document, SearchEngine};
use crate::seeders::SeederRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Producer side of the change feed
pub type ContentEventSender = mpsc::Sender<ContentEvent>;

/// What handling one event did to the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub upserted: usize,
    pub deleted: usize,
}

/// Routes change events to every seeder that claims them
pub struct ChangeSync {
    registry: SeederRegistry,
    engine: Arc<dyn SearchEngine>,
}

impl ChangeSync {
    pub fn new(registry: SeederRegistry, engine: Arc<dyn SearchEngine>) -> Self {
        Self { registry, engine }
    }

    /// Bounded event channel for `spawn`
    pub fn channel(capacity: usize) -> (ContentEventSender, mpsc::Receiver<ContentEvent>) {
        mpsc::channel(capacity.max(1))
    }

    /// Upsert or delete the documents an event concerns
    pub async fn handle(&self, event: &ContentEvent) -> IndexingResult<SyncOutcome> {
        let mut outcome = SyncOutcome::default();

        for seeder in self.registry.iter() {
            if let Some(row) = seeder.on_save(event) {
                match seeder.to_document(&row) {
                    Ok(document) => {
                        let response = self.engine.bulk_upsert(&[document], true).await?;
                        if let Some(failed) = response.first_error() {
                            let reason = failed
                                .error
                                .as_ref()
                                .map(|error| error.reason.clone())
                                .unwrap_or_default();
                            return Err(IndexingError::SeedingFailed {
                                reason,
                                items: response.items,
                            });
                        }
                        outcome.upserted += 1;
                    }
                    Err(e) => warn!(
                        event = event.name(),
                        content_type = %seeder.content_type(),
                        error = %e,
                        "Event row cannot be indexed"
                    ),
                }
            }

            if let Some(raw_id) = seeder.on_delete(event) {
                let id = Document::document_id(seeder.content_type(), raw_id);
                self.engine.delete_document(&id).await?;
                outcome.deleted += 1;
            }
        }

        debug!(
            event = event.name(),
            upserted = outcome.upserted,
            deleted = outcome.deleted,
            "Handled content event"
        );

        Ok(outcome)
    }

    /// Consume events until every sender is dropped
    pub fn spawn(self: Arc<Self>, mut receiver: mpsc::Receiver<ContentEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Change sync started");

            while let Some(event) = receiver.recv().await {
                if let Err(e) = self.handle(&event).await {
                    error!(event = event.name(), error = %e, "Failed to sync content event");
                }
            }

            info!("Change sync stopped");
        })
    }
}
