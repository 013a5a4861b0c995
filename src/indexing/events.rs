//! Change notifications emitted by the forum

use crate::models::{Discussion, Post};
use serde::{Deserialize, Serialize};

/// A domain change that may require reindexing or removing a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContentEvent {
    DiscussionStarted { discussion: Discussion },
    DiscussionRestored { discussion: Discussion },
    DiscussionMadePublic { discussion: Discussion },
    DiscussionRecipientsChanged { discussion: Discussion },
    DiscussionRemovedSelf { discussion: Discussion },
    DiscussionDeleted { discussion: Discussion },
    DiscussionHidden { discussion: Discussion },

    PostPosted {
        post: Post,
        #[serde(default)]
        discussion: Option<Discussion>,
    },
    PostDeleted {
        post: Post,
        #[serde(default)]
        discussion: Option<Discussion>,
    },
}

impl ContentEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ContentEvent::DiscussionStarted { .. } => "discussion_started",
            ContentEvent::DiscussionRestored { .. } => "discussion_restored",
            ContentEvent::DiscussionMadePublic { .. } => "discussion_made_public",
            ContentEvent::DiscussionRecipientsChanged { .. } => "discussion_recipients_changed",
            ContentEvent::DiscussionRemovedSelf { .. } => "discussion_removed_self",
            ContentEvent::DiscussionDeleted { .. } => "discussion_deleted",
            ContentEvent::DiscussionHidden { .. } => "discussion_hidden",
            ContentEvent::PostPosted { .. } => "post_posted",
            ContentEvent::PostDeleted { .. } => "post_deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_from_json_line() {
        let event: ContentEvent = serde_json::from_str(
            r#"{"event": "post_posted", "post": {"id": 9, "discussion_id": 2, "content": "hi", "created_at": "2024-03-01T10:00:00Z"}}"#,
        )
        .unwrap();

        match &event {
            ContentEvent::PostPosted { post, discussion } => {
                assert_eq!(post.id, 9);
                assert!(discussion.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(event.name(), "post_posted");
    }
}
