//! Content-type adapters between forum rows and search documents
//!
//! Each seeder owns one content type: it reads that type's rows from the
//! forum store window by window, converts them into documents and decides
//! which change events concern it.

mod comment;
mod discussion;
mod registry;

pub use comment::CommentSeeder;
pub use discussion::DiscussionSeeder;
pub use registry::SeederRegistry;

use crate::error::Result;
use crate::indexing::ContentEvent;
use crate::models::{CommentRow, Discussion, Group};
use crate::search::{Document, SearchConfig};
use crate::state::WindowQuery;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A forum row handed to a seeder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRow {
    Discussion(Discussion),
    Comment(CommentRow),
}

impl SourceRow {
    /// Primary key within the row's own table
    pub fn id(&self) -> i64 {
        match self {
            SourceRow::Discussion(discussion) => discussion.id,
            SourceRow::Comment(row) => row.post.id,
        }
    }
}

/// A row that cannot become a document
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("post {post_id} has no discussion {discussion_id}")]
    MissingDiscussion { post_id: i64, discussion_id: i64 },

    #[error("{seeder} seeder cannot convert row {row_id}")]
    UnexpectedRow { seeder: String, row_id: i64 },

    #[error("row {row_id} is not indexable: {reason}")]
    NotIndexable { row_id: i64, reason: String },
}

/// Optional document fields, following the forum extensions in use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeederOptions {
    /// Documents carry tag ids
    pub tags: bool,

    /// Documents carry active recipient users and groups
    pub private_messaging: bool,

    /// Discussion documents carry the sticky flag
    pub sticky: bool,
}

impl From<&SearchConfig> for SeederOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            tags: config.tags,
            private_messaging: config.private_messaging,
            sticky: config.sticky,
        }
    }
}

/// Source adapter for one content type
#[async_trait]
pub trait Seeder: Send + Sync {
    /// Content-type tag written into every document
    fn content_type(&self) -> &str;

    /// Relevance multiplier applied to this type's text matches
    fn boost(&self) -> f64 {
        1.0
    }

    /// Highest row id of this type
    async fn max_id(&self) -> Result<Option<i64>>;

    /// Indexable rows of a window, newest id first
    async fn rows(&self, window: &WindowQuery) -> Result<Vec<SourceRow>>;

    fn to_document(&self, row: &SourceRow) -> std::result::Result<Document, ConversionError>;

    /// Row to (re)index in reaction to an event, if the event concerns this type
    fn on_save(&self, event: &ContentEvent) -> Option<SourceRow>;

    /// Row id to remove in reaction to an event, if the event concerns this type
    fn on_delete(&self, event: &ContentEvent) -> Option<i64>;
}

/// Groups permitted to see a discussion; no explicit groups means public
pub(crate) fn groups_for(discussion: &Discussion) -> Vec<i64> {
    if discussion.view_groups.is_empty() {
        vec![Group::GUEST_ID]
    } else {
        discussion.view_groups.clone()
    }
}

/// Fill the extension fields both seeders take from a discussion
pub(crate) fn apply_extensions(
    mut document: Document,
    discussion: &Discussion,
    options: &SeederOptions,
) -> Document {
    if options.tags {
        document.tags = Some(discussion.tag_ids.clone());
    }
    if options.private_messaging {
        document.recipient_users = Some(discussion.active_recipient_users());
        document.recipient_groups = Some(discussion.active_recipient_groups());
    }
    document
}
