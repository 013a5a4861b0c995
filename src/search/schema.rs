//! Index settings and document mapping used when (re)creating the index

use serde_json::{json, Value};

pub const FULL_ANALYZER: &str = "forum_analyzer";
pub const PARTIAL_ANALYZER: &str = "forum_analyzer_partial";

/// Analyzer settings for a new index.
///
/// `tokenizer` is the engine tokenizer both analyzers build on (`standard`,
/// or a language plugin tokenizer such as `ik_smart`).
pub fn index_settings(tokenizer: &str) -> Value {
    json!({
        "index.max_ngram_diff": 20,
        "analysis": {
            "analyzer": {
                FULL_ANALYZER: {
                    "type": "custom",
                    "tokenizer": tokenizer,
                    "filter": ["lowercase"]
                },
                PARTIAL_ANALYZER: {
                    "type": "custom",
                    "tokenizer": tokenizer,
                    "filter": ["lowercase", "partial_search_filter"]
                }
            },
            "filter": {
                "partial_search_filter": {
                    "type": "edge_ngram",
                    "min_gram": 2,
                    "max_gram": 20,
                    "token_chars": ["letter", "digit", "symbol"]
                }
            }
        }
    })
}

/// Field mapping shared by every content type
pub fn document_mapping() -> Value {
    json!({
        "properties": {
            "type": { "type": "keyword" },
            "id": { "type": "keyword" },
            "content": {
                "type": "text",
                "analyzer": PARTIAL_ANALYZER,
                "search_analyzer": FULL_ANALYZER
            },
            "content_partial": {
                "type": "text",
                "analyzer": PARTIAL_ANALYZER,
                "search_analyzer": FULL_ANALYZER
            },
            "rawId": { "type": "integer" },
            "user_id": { "type": "integer" },
            "created_at": { "type": "date" },
            "updated_at": { "type": "date" },
            "is_private": { "type": "boolean" },
            "is_sticky": { "type": "boolean" },
            "groups": { "type": "integer" },
            "tags": { "type": "integer" },
            "recipient_groups": { "type": "integer" },
            "recipient_users": { "type": "integer" },
            "comment_count": { "type": "integer" },
            "view_count": { "type": "integer" }
        }
    })
}
