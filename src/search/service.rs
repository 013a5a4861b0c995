//! Main search service implementation

use crate::error::Result;
use crate::models::Actor;
use crate::search::builder::{RelevanceQueryBuilder, SearchCriteria, SortField};
use crate::search::engine::{SearchEngine, SearchHit};
use crate::search::merger::{Include, ResultMerger, ResultRow};
use crate::state::ForumStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Page size when none is requested
pub const DEFAULT_LIMIT: usize = 20;

/// Largest page size honoured
pub const MAX_LIMIT: usize = 50;

/// Raw parameters of a discussion search
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    /// Search text, may carry the `is:private` directive
    #[serde(default)]
    pub q: String,

    /// Tag slug to filter on
    #[serde(default)]
    pub tag: Option<String>,

    /// Comma separated sort list, e.g. `-lastPostedAt,commentCount`
    #[serde(default)]
    pub sort: Option<String>,

    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub offset: usize,

    /// Comma separated relations to attach
    #[serde(default)]
    pub include: Option<String>,
}

impl SearchParams {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// One page of ranked discussions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    pub rows: Vec<ResultRow>,

    /// More hits exist past this page
    pub has_more: bool,

    pub offset: usize,
    pub limit: usize,

    /// Search execution time in milliseconds
    pub search_time_ms: u64,
}

/// Runs relevance searches and re-hydrates them into discussions
pub struct SearchService {
    builder: RelevanceQueryBuilder,
    engine: Arc<dyn SearchEngine>,
    merger: ResultMerger,
    store: Arc<dyn ForumStore>,
}

impl SearchService {
    pub fn new(
        builder: RelevanceQueryBuilder,
        engine: Arc<dyn SearchEngine>,
        store: Arc<dyn ForumStore>,
    ) -> Self {
        Self {
            builder,
            engine,
            merger: ResultMerger::new(store.clone()),
            store,
        }
    }

    /// Search discussions on behalf of an actor
    pub async fn search(&self, actor: &Actor, params: &SearchParams) -> Result<SearchResults> {
        let start_time = Instant::now();
        let limit = params.limit();

        // An unknown slug searches without a tag filter
        let tag_id = match params.tag.as_deref().filter(|slug| !slug.is_empty()) {
            Some(slug) => self.store.tag_id_for_slug(slug).await?,
            None => None,
        };

        let criteria = SearchCriteria::parse(&params.q)
            .with_tag(tag_id)
            .with_sort(params.sort.as_deref().map(SortField::parse_list).unwrap_or_default())
            .with_page(limit, params.offset);

        let built = self.builder.build(&criteria, actor)?;
        debug!(query = %built.request.to_json(), "Executing search");

        let response = self.engine.search(&built.request).await?;
        let hits: Vec<SearchHit> = response.hits().iter().filter_map(SearchHit::from_raw).collect();

        let merged = self
            .merger
            .merge(&hits, params.offset, limit, &built.sorts, actor)
            .await?;

        let mut rows = merged.rows;
        let includes = params
            .include
            .as_deref()
            .map(Include::parse_list)
            .unwrap_or_default();
        self.merger.load_relations(&mut rows, &includes).await?;

        let search_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            actor_id = actor.id,
            hits = hits.len(),
            results = rows.len(),
            search_time_ms,
            "Search completed"
        );

        Ok(SearchResults {
            rows,
            has_more: merged.has_more,
            offset: params.offset,
            limit,
            search_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Discussion, Group};
    use crate::search::{Document, InMemoryEngine, SearchConfig, Searcher};
    use crate::state::InMemoryForumStore;
    use chrono::Utc;

    async fn service() -> SearchService {
        let store = Arc::new(InMemoryForumStore::new());
        let engine = Arc::new(InMemoryEngine::new());
        let mut documents = Vec::new();
        for (id, title) in [(1, "Rust async runtime"), (2, "Cooking pasta"), (3, "Rust borrow checker")] {
            store.insert_discussion(Discussion::new(id, title, Utc::now()));
            documents.push(
                Document::new("discussions", id, title).with_visibility(false, vec![Group::GUEST_ID]),
            );
        }
        engine.bulk_upsert(&documents, true).await.unwrap();

        let builder = RelevanceQueryBuilder::new(
            SearchConfig::default(),
            vec![Searcher::new("discussions", 1.0)],
        );
        SearchService::new(builder, engine, store)
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(SearchParams::default().limit(), DEFAULT_LIMIT);
        let params = SearchParams {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(params.limit(), MAX_LIMIT);
    }

    #[tokio::test]
    async fn test_search_returns_matching_discussions() {
        let service = service().await;
        let results = service
            .search(&Actor::guest(), &SearchParams::new("rust"))
            .await
            .unwrap();

        let ids: Vec<i64> = results.rows.iter().map(|row| row.discussion.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&1));
        assert!(ids.contains(&3));
        assert!(!results.has_more);
    }

    #[tokio::test]
    async fn test_unknown_sort_is_validation_error() {
        let service = service().await;
        let params = SearchParams {
            sort: Some("-popularity".to_string()),
            ..SearchParams::new("rust")
        };

        let err = service.search(&Actor::guest(), &params).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
