//! The record synchronised to the search engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One indexed row of one content type.
///
/// `id` is always `type:rawId`, so indexing the same row twice replaces the
/// earlier document instead of adding a second one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Content-type tag (`discussions`, `posts`, ...)
    #[serde(rename = "type")]
    pub doc_type: String,

    /// Composite key, unique in the index
    pub id: String,

    /// Primary key of the row within its own table
    #[serde(rename = "rawId")]
    pub raw_id: i64,

    /// Body indexed with the full-token analyzer
    #[serde(default)]
    pub content: String,

    /// Body indexed with the edge-ngram analyzer
    #[serde(default)]
    pub content_partial: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_private: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sticky: Option<bool>,

    #[serde(default)]
    pub user_id: Option<i64>,

    /// Groups allowed to see the document when it is not private
    #[serde(default)]
    pub groups: Vec<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_groups: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_users: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<i64>>,

    #[serde(default)]
    pub comment_count: i64,

    #[serde(default)]
    pub view_count: i64,
}

impl Document {
    /// Create a document with its identity and body set
    pub fn new(doc_type: impl Into<String>, raw_id: i64, content: impl Into<String>) -> Self {
        let doc_type = doc_type.into();
        let content = content.into();
        Self {
            id: Self::document_id(&doc_type, raw_id),
            doc_type,
            raw_id,
            content_partial: content.clone(),
            content,
            created_at: None,
            updated_at: None,
            is_private: false,
            is_sticky: None,
            user_id: None,
            groups: Vec::new(),
            recipient_groups: None,
            recipient_users: None,
            tags: None,
            comment_count: 0,
            view_count: 0,
        }
    }

    /// Composite index key for a row
    pub fn document_id(doc_type: &str, raw_id: i64) -> String {
        format!("{}:{}", doc_type, raw_id)
    }

    /// Recover the row id from a composite key of the given type
    pub fn parse_id(doc_type: &str, id: &str) -> Option<i64> {
        id.strip_prefix(doc_type)?
            .strip_prefix(':')?
            .parse()
            .ok()
    }

    pub fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub fn with_author(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_visibility(mut self, is_private: bool, groups: Vec<i64>) -> Self {
        self.is_private = is_private;
        self.groups = groups;
        self
    }

    pub fn with_counts(mut self, comment_count: i64, view_count: i64) -> Self {
        self.comment_count = comment_count;
        self.view_count = view_count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_type_and_raw_id() {
        let doc = Document::new("discussions", 42, "Install error on arm64");
        assert_eq!(doc.id, "discussions:42");
        assert_eq!(doc.content, doc.content_partial);
        assert_eq!(Document::parse_id("discussions", &doc.id), Some(42));
    }

    #[test]
    fn test_parse_id_rejects_other_types() {
        assert_eq!(Document::parse_id("posts", "discussions:42"), None);
        assert_eq!(Document::parse_id("posts", "postsX:42"), None);
        assert_eq!(Document::parse_id("posts", "posts:abc"), None);
    }

    #[test]
    fn test_wire_field_names() {
        let doc = Document::new("posts", 7, "hello").with_counts(3, 10);
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["type"], "posts");
        assert_eq!(value["rawId"], 7);
        assert_eq!(value["comment_count"], 3);
        // optional extension fields are left out entirely
        assert!(value.get("tags").is_none());
        assert!(value.get("is_sticky").is_none());
        assert!(value.get("recipient_users").is_none());
    }
}
