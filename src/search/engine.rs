//! Search engine abstraction shared by indexing and querying

use crate::search::document::Document;
use crate::search::error::SearchResult;
use crate::search::query::SearchRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operations the pipeline needs from the external search engine.
///
/// Implementations are shared through `Arc` between concurrent search
/// requests and indexing workers.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Index-or-replace every document, keyed by `Document::id`
    async fn bulk_upsert(&self, documents: &[Document], refresh: bool) -> SearchResult<BulkResponse>;

    /// Remove one document; a missing document is not an error
    async fn delete_document(&self, id: &str) -> SearchResult<()>;

    async fn search(&self, request: &SearchRequest) -> SearchResult<SearchResponse>;

    /// Drop the index; a missing index is not an error
    async fn delete_index(&self) -> SearchResult<()>;

    async fn create_index(&self, settings: Value) -> SearchResult<()>;

    async fn put_mapping(&self, mapping: Value) -> SearchResult<()>;
}

/// Answer of a bulk request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub errors: bool,

    #[serde(default)]
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    /// First item the engine rejected
    pub fn first_error(&self) -> Option<&BulkItemResult> {
        self.items
            .iter()
            .map(|item| &item.index)
            .find(|result| result.error.is_some())
    }

    pub fn failed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.index.error.is_some())
            .count()
    }
}

/// One entry of `items`, keyed by the action that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItem {
    #[serde(alias = "create", alias = "update")]
    pub index: BulkItemResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(default)]
    pub status: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BulkItemError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub error_type: String,

    #[serde(default)]
    pub reason: String,
}

/// Answer of a `_search` request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: HitsEnvelope,
}

impl SearchResponse {
    pub fn hits(&self) -> &[RawHit] {
        &self.hits.hits
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: Option<HitsTotal>,

    #[serde(default)]
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitsTotal {
    pub value: u64,
}

/// One ranked hit as returned by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Absent when results are sorted by field
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,

    #[serde(rename = "_source", default)]
    pub source: HitSource,
}

/// The part of `_source` needed to map a hit back to its row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitSource {
    #[serde(rename = "type", default)]
    pub doc_type: String,

    #[serde(default)]
    pub id: String,

    #[serde(rename = "rawId", default)]
    pub raw_id: Option<i64>,
}

/// `{type, rawId, score}` extracted from an engine hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_type: String,
    pub raw_id: i64,
    pub score: f64,
}

impl SearchHit {
    /// Recover the row id from `_source.id`, falling back to `rawId`
    pub fn from_raw(hit: &RawHit) -> Option<Self> {
        let source = &hit.source;
        let raw_id = Document::parse_id(&source.doc_type, &source.id).or(source.raw_id)?;
        Some(Self {
            doc_type: source.doc_type.clone(),
            raw_id,
            score: hit.score.unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_response_first_error() {
        let response: BulkResponse = serde_json::from_str(
            r#"{
                "errors": true,
                "items": [
                    {"index": {"_id": "posts:1", "status": 201}},
                    {"index": {"_id": "posts:2", "status": 400,
                        "error": {"type": "mapper_parsing_exception", "reason": "failed to parse field [created_at]"}}},
                    {"create": {"_id": "posts:3", "status": 409,
                        "error": {"type": "version_conflict_engine_exception", "reason": "conflict"}}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(response.failed_count(), 2);
        let first = response.first_error().unwrap();
        assert_eq!(first.id, "posts:2");
        assert_eq!(
            first.error.as_ref().unwrap().reason,
            "failed to parse field [created_at]"
        );
    }

    #[test]
    fn test_hit_from_source_id() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"hits": {"total": {"value": 1}, "hits": [
                {"_id": "posts:12", "_score": 2.5, "_source": {"type": "posts", "id": "posts:12", "rawId": 12}}
            ]}}"#,
        )
        .unwrap();

        let hit = SearchHit::from_raw(&response.hits()[0]).unwrap();
        assert_eq!(hit.doc_type, "posts");
        assert_eq!(hit.raw_id, 12);
        assert_eq!(hit.score, 2.5);
    }

    #[test]
    fn test_sorted_hit_without_score() {
        let raw: RawHit = serde_json::from_str(
            r#"{"_id": "discussions:3", "_score": null, "_source": {"type": "discussions", "id": "discussions:3"}}"#,
        )
        .unwrap();
        let hit = SearchHit::from_raw(&raw).unwrap();
        assert_eq!(hit.raw_id, 3);
        assert_eq!(hit.score, 0.0);
    }
}
