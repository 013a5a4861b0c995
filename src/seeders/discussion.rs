use crate::error::Result;
use crate::indexing::ContentEvent;
use crate::models::ContentType;
use crate::search::Document;
use crate::seeders::{apply_extensions, groups_for, ConversionError, Seeder, SeederOptions, SourceRow};
use crate::state::{ForumStore, WindowQuery};
use async_trait::async_trait;
use std::sync::Arc;

/// Indexes discussion titles
pub struct DiscussionSeeder {
    store: Arc<dyn ForumStore>,
    options: SeederOptions,
    boost: f64,
}

impl DiscussionSeeder {
    pub fn new(store: Arc<dyn ForumStore>, options: SeederOptions) -> Self {
        Self {
            store,
            options,
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f64) -> Self {
        self.boost = boost;
        self
    }
}

#[async_trait]
impl Seeder for DiscussionSeeder {
    fn content_type(&self) -> &str {
        ContentType::DISCUSSIONS
    }

    fn boost(&self) -> f64 {
        self.boost
    }

    async fn max_id(&self) -> Result<Option<i64>> {
        self.store.max_discussion_id().await
    }

    async fn rows(&self, window: &WindowQuery) -> Result<Vec<SourceRow>> {
        Ok(self
            .store
            .discussions_in_window(window)
            .await?
            .into_iter()
            .map(SourceRow::Discussion)
            .collect())
    }

    fn to_document(&self, row: &SourceRow) -> std::result::Result<Document, ConversionError> {
        let discussion = match row {
            SourceRow::Discussion(discussion) => discussion,
            other => {
                return Err(ConversionError::UnexpectedRow {
                    seeder: self.content_type().to_string(),
                    row_id: other.id(),
                })
            }
        };

        let mut document = Document::new(self.content_type(), discussion.id, discussion.title.as_str())
            .with_timestamps(Some(discussion.created_at), discussion.last_posted_at)
            .with_author(discussion.user_id)
            .with_visibility(discussion.is_private, groups_for(discussion))
            .with_counts(discussion.comment_count, discussion.view_count);

        if self.options.sticky {
            document.is_sticky = Some(discussion.is_sticky);
        }

        Ok(apply_extensions(document, discussion, &self.options))
    }

    fn on_save(&self, event: &ContentEvent) -> Option<SourceRow> {
        match event {
            ContentEvent::DiscussionStarted { discussion }
            | ContentEvent::DiscussionRestored { discussion }
            | ContentEvent::DiscussionMadePublic { discussion }
            | ContentEvent::DiscussionRecipientsChanged { discussion }
            | ContentEvent::DiscussionRemovedSelf { discussion } => {
                Some(SourceRow::Discussion(discussion.clone()))
            }
            _ => None,
        }
    }

    fn on_delete(&self, event: &ContentEvent) -> Option<i64> {
        match event {
            ContentEvent::DiscussionDeleted { discussion }
            | ContentEvent::DiscussionHidden { discussion } => Some(discussion.id),
            _ => None,
        }
    }
}
