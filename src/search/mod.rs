//! Relevance search over forum discussions and posts
//!
//! This module provides the query side of the crate along with the engine
//! seam the indexer writes through:
//!
//! - **Documents**: one [`Document`] per indexed row, keyed `type:rawId`
//! - **Query tree**: an immutable [`Query`] serialised once to the
//!   Elasticsearch DSL
//! - **Relevance builder**: per-type text clauses, tag and visibility filters,
//!   popularity scoring or explicit sorts
//! - **Result merging**: hits folded back onto discussions, with the pages
//!   already served excluded
//! - **Engines**: [`ElasticClient`] over the REST API and [`InMemoryEngine`]
//!   for development and tests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           SearchService                          │
//! ├─────────────────────────────────────────────────┤
//! │  RelevanceQueryBuilder  ->  SearchEngine        │
//! │  ResultMerger (ForumStore)                      │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │   ElasticClient (_bulk, _search, index admin)    │
//! │   InMemoryEngine                                 │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use forum_search::models::Actor;
//! use forum_search::search::{
//!     ElasticClient, ElasticSettings, RelevanceQueryBuilder, SearchConfig, SearchParams,
//!     SearchService, Searcher,
//! };
//! use forum_search::state::InMemoryForumStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ElasticClient::new(ElasticSettings::new("http://localhost:9200", "forum"))?;
//!     let builder = RelevanceQueryBuilder::new(
//!         SearchConfig::default(),
//!         vec![Searcher::new("discussions", 1.0), Searcher::new("posts", 1.0)],
//!     );
//!     let search = SearchService::new(builder, Arc::new(engine), Arc::new(InMemoryForumStore::new()));
//!
//!     let results = search.search(&Actor::guest(), &SearchParams::new("borrow checker")).await?;
//!     println!("Found {} discussions", results.rows.len());
//!
//!     Ok(())
//! }
//! ```

mod builder;
mod config;
mod document;
mod elastic;
mod engine;
mod error;
mod memory;
mod merger;
mod query;
pub mod schema;
mod service;

pub use builder::{
    BuiltQuery, RelevanceQueryBuilder, SearchCriteria, Searcher, SortField, AND_WORDS_BOOST,
    ONLY_PRIVATE_TOKEN, OR_WORDS_BOOST, PHRASE_BOOST,
};
pub use config::{SearchConfig, SearchConfigBuilder};
pub use document::Document;
pub use elastic::{ElasticClient, ElasticSettings};
pub use engine::{
    BulkItem, BulkItemError, BulkItemResult, BulkResponse, HitSource, HitsEnvelope, HitsTotal,
    RawHit, SearchEngine, SearchHit, SearchResponse,
};
pub use error::{SearchError, SearchResult};
pub use memory::InMemoryEngine;
pub use merger::{Include, MergedResults, ResultMerger, ResultRow};
pub use query::{
    BoolQuery, FieldSort, Modifier, Operator, Query, RangeBounds, ScoreFunction, ScoreMode,
    SearchRequest, SortOrder,
};
pub use service::{SearchParams, SearchResults, SearchService, DEFAULT_LIMIT, MAX_LIMIT};
