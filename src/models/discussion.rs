use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user or group added as recipient of a private discussion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    pub id: i64,

    /// Set once the recipient left or was removed
    #[serde(default)]
    pub removed_at: Option<DateTime<Utc>>,
}

impl Recipient {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            removed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.removed_at.is_none()
    }
}

/// A forum discussion as loaded from the domain store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discussion {
    pub id: i64,

    pub title: String,

    /// Author
    #[serde(default)]
    pub user_id: Option<i64>,

    pub created_at: DateTime<Utc>,

    /// Time of the latest reply
    #[serde(default)]
    pub last_posted_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub comment_count: i64,

    #[serde(default)]
    pub view_count: i64,

    #[serde(default)]
    pub is_private: bool,

    #[serde(default)]
    pub is_sticky: bool,

    #[serde(default)]
    pub hidden_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub first_post_id: Option<i64>,

    #[serde(default)]
    pub last_post_id: Option<i64>,

    #[serde(default)]
    pub tag_ids: Vec<i64>,

    /// Groups allowed to see the discussion when it is not private
    #[serde(default)]
    pub view_groups: Vec<i64>,

    #[serde(default)]
    pub recipient_users: Vec<Recipient>,

    #[serde(default)]
    pub recipient_groups: Vec<Recipient>,
}

impl Discussion {
    pub fn new(id: i64, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            user_id: None,
            created_at,
            last_posted_at: None,
            comment_count: 0,
            view_count: 0,
            is_private: false,
            is_sticky: false,
            hidden_at: None,
            first_post_id: None,
            last_post_id: None,
            tag_ids: Vec::new(),
            view_groups: Vec::new(),
            recipient_users: Vec::new(),
            recipient_groups: Vec::new(),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden_at.is_some()
    }

    /// Last activity, falling back to creation for discussions without replies
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_posted_at.unwrap_or(self.created_at)
    }

    pub fn active_recipient_users(&self) -> Vec<i64> {
        self.recipient_users
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.id)
            .collect()
    }

    pub fn active_recipient_groups(&self) -> Vec<i64> {
        self.recipient_groups
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.id)
            .collect()
    }
}

/// A post inside a discussion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,

    pub discussion_id: i64,

    #[serde(default)]
    pub user_id: Option<i64>,

    /// `comment` for regular replies; other types are event posts
    #[serde(default = "default_post_type")]
    pub post_type: String,

    #[serde(default)]
    pub content: String,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_private: bool,

    #[serde(default)]
    pub hidden_at: Option<DateTime<Utc>>,
}

impl Post {
    pub const COMMENT_TYPE: &'static str = "comment";

    pub fn comment(
        id: i64,
        discussion_id: i64,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            discussion_id,
            user_id: None,
            post_type: Self::COMMENT_TYPE.to_string(),
            content: content.into(),
            created_at,
            edited_at: None,
            is_private: false,
            hidden_at: None,
        }
    }

    pub fn is_comment(&self) -> bool {
        self.post_type == Self::COMMENT_TYPE
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden_at.is_some()
    }
}

fn default_post_type() -> String {
    Post::COMMENT_TYPE.to_string()
}

/// A comment joined with its owning discussion.
///
/// The discussion is `None` when the row is orphaned; such rows cannot be
/// converted into documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentRow {
    pub post: Post,

    #[serde(default)]
    pub discussion: Option<Discussion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_activity_falls_back_to_creation() {
        let created = Utc::now();
        let mut discussion = Discussion::new(1, "Hello", created);
        assert_eq!(discussion.last_activity(), created);

        let replied = created + chrono::Duration::hours(2);
        discussion.last_posted_at = Some(replied);
        assert_eq!(discussion.last_activity(), replied);
    }

    #[test]
    fn test_removed_recipients_are_inactive() {
        let mut discussion = Discussion::new(1, "Private", Utc::now());
        discussion.recipient_users = vec![
            Recipient::new(10),
            Recipient {
                id: 11,
                removed_at: Some(Utc::now()),
            },
        ];
        assert_eq!(discussion.active_recipient_users(), vec![10]);
    }

    #[test]
    fn test_post_deserializes_as_comment_by_default() {
        let post: Post = serde_json::from_str(
            r#"{"id": 3, "discussion_id": 1, "created_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(post.is_comment());
    }
}
