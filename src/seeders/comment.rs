use crate::error::Result;
use crate::indexing::ContentEvent;
use crate::models::{CommentRow, ContentType};
use crate::search::Document;
use crate::seeders::{apply_extensions, groups_for, ConversionError, Seeder, SeederOptions, SourceRow};
use crate::state::{ForumStore, WindowQuery};
use async_trait::async_trait;
use std::sync::Arc;

/// Indexes the body of comment posts
pub struct CommentSeeder {
    store: Arc<dyn ForumStore>,
    options: SeederOptions,
    boost: f64,
}

impl CommentSeeder {
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
impl Seeder for CommentSeeder {
    fn content_type(&self) -> &str {
        ContentType::POSTS
    }

    fn boost(&self) -> f64 {
        self.boost
    }

    async fn max_id(&self) -> Result<Option<i64>> {
        self.store.max_comment_id().await
    }

    async fn rows(&self, window: &WindowQuery) -> Result<Vec<SourceRow>> {
        Ok(self
            .store
            .comments_in_window(window)
            .await?
            .into_iter()
            .map(SourceRow::Comment)
            .collect())
    }

    fn to_document(&self, row: &SourceRow) -> std::result::Result<Document, ConversionError> {
        let CommentRow { post, discussion } = match row {
            SourceRow::Comment(row) => row,
            other => {
                return Err(ConversionError::UnexpectedRow {
                    seeder: self.content_type().to_string(),
                    row_id: other.id(),
                })
            }
        };

        if !post.is_comment() {
            return Err(ConversionError::NotIndexable {
                row_id: post.id,
                reason: format!("post type {}", post.post_type),
            });
        }

        let discussion = discussion
            .as_ref()
            .ok_or(ConversionError::MissingDiscussion {
                post_id: post.id,
                discussion_id: post.discussion_id,
            })?;

        let document = Document::new(self.content_type(), post.id, post.content.as_str())
            .with_timestamps(Some(post.created_at), post.edited_at)
            .with_author(post.user_id)
            .with_visibility(
                post.is_private || discussion.is_private,
                groups_for(discussion),
            )
            .with_counts(discussion.comment_count, discussion.view_count);

        Ok(apply_extensions(document, discussion, &self.options))
    }

    fn on_save(&self, event: &ContentEvent) -> Option<SourceRow> {
        match event {
            ContentEvent::PostPosted { post, discussion } if post.is_comment() => {
                Some(SourceRow::Comment(CommentRow {
                    post: post.clone(),
                    discussion: discussion.clone(),
                }))
            }
            _ => None,
        }
    }

    fn on_delete(&self, event: &ContentEvent) -> Option<i64> {
        match event {
            ContentEvent::PostDeleted { post, .. } if post.is_comment() => Some(post.id),
            _ => None,
        }
    }
}
