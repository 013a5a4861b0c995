//! Relevance query builder
//!
//! Turns a search request (free text, tag, sort) plus the searching actor
//! into a single engine query. Text clauses are scoped per content type so
//! every searchable type competes under its own boost.

use crate::models::Actor;
use crate::search::config::SearchConfig;
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::{
    BoolQuery, FieldSort, Modifier, Operator, Query, ScoreFunction, ScoreMode, SearchRequest,
    SortOrder,
};
use serde::{Deserialize, Serialize};

/// Directive token selecting private discussions only
pub const ONLY_PRIVATE_TOKEN: &str = "is:private";

/// Base boost of the exact phrase clause
pub const PHRASE_BOOST: f64 = 0.4;

/// Base boost of the all-words clause
pub const AND_WORDS_BOOST: f64 = 1.8;

/// Base boost of the any-word clause
pub const OR_WORDS_BOOST: f64 = 0.8;

const CONTENT_FIELD: &str = "content";

/// A content type taking part in text matching, with its relevance multiplier
#[derive(Debug, Clone, PartialEq)]
pub struct Searcher {
    pub content_type: String,
    pub boost: f64,
}

impl Searcher {
    pub fn new(content_type: impl Into<String>, boost: f64) -> Self {
        Self {
            content_type: content_type.into(),
            boost,
        }
    }
}

/// A requested sort, e.g. `-lastPostedAt`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortField {
    pub name: String,
    pub order: SortOrder,
}

impl SortField {
    /// Parse the API sort notation; a leading `-` means descending
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (name, order) = match raw.strip_prefix('-') {
            Some(name) => (name, SortOrder::Descending),
            None => (raw, SortOrder::Ascending),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            order,
        })
    }

    /// Parse a comma separated sort list
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',').filter_map(Self::parse).collect()
    }

    /// Document field backing an API sort name
    pub fn translate(name: &str) -> SearchResult<&'static str> {
        match name {
            "lastPostedAt" => Ok("updated_at"),
            "createdAt" => Ok("created_at"),
            "commentCount" => Ok("comment_count"),
            "view_count" => Ok("view_count"),
            other => Err(SearchError::InvalidSort(other.to_string())),
        }
    }
}

/// Everything the builder needs from one search request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    /// Search text with directive tokens removed
    pub text: Option<String>,

    /// The request carried the only-private directive
    pub only_private: bool,

    /// Resolved tag id to filter on
    pub tag_id: Option<i64>,

    pub sort: Vec<SortField>,

    pub limit: usize,

    pub offset: usize,
}

impl SearchCriteria {
    /// Split raw search input into text and directives
    pub fn parse(raw: &str) -> Self {
        let only_private = raw.split(' ').any(|part| part == ONLY_PRIVATE_TOKEN);
        let text = raw
            .split(' ')
            .filter(|part| !part.is_empty() && *part != ONLY_PRIVATE_TOKEN)
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            text: if text.is_empty() { None } else { Some(text) },
            only_private,
            limit: 20,
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag_id: Option<i64>) -> Self {
        self.tag_id = tag_id;
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortField>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// The engine request plus the translated sort fields it uses.
///
/// An empty `sorts` list means results are ranked by engine score.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub request: SearchRequest,
    pub sorts: Vec<String>,
}

/// Builds relevance queries for a fixed set of searchers
#[derive(Debug, Clone)]
pub struct RelevanceQueryBuilder {
    config: SearchConfig,
    searchers: Vec<Searcher>,
}

impl RelevanceQueryBuilder {
    pub fn new(config: SearchConfig, searchers: Vec<Searcher>) -> Self {
        Self { config, searchers }
    }

    pub fn searchers(&self) -> &[Searcher] {
        &self.searchers
    }

    /// Build the engine request for one search
    pub fn build(&self, criteria: &SearchCriteria, actor: &Actor) -> SearchResult<BuiltQuery> {
        let mut root = BoolQuery::new();

        if let Some(text) = criteria.text.as_deref() {
            if self.config.match_sentences {
                root = root.should(self.per_type(&Query::match_phrase(CONTENT_FIELD, text), PHRASE_BOOST));
            }
            if self.config.match_words {
                root = root
                    .should(self.per_type(
                        &Query::match_words(CONTENT_FIELD, text, Operator::And),
                        AND_WORDS_BOOST,
                    ))
                    .should(self.per_type(
                        &Query::match_words(CONTENT_FIELD, text, Operator::Or),
                        OR_WORDS_BOOST,
                    ));
            }
            if !root.should.is_empty() {
                root = root.minimum_should_match(1);
            }
        }

        if let Some(tag_id) = criteria.tag_id {
            root = root.filter(Query::term("tags", tag_id));
        }

        root = root.filter(self.visibility(actor, criteria.only_private));

        let mut sorts = Vec::with_capacity(criteria.sort.len());
        let mut field_sorts = Vec::with_capacity(criteria.sort.len());
        for sort in &criteria.sort {
            let field = SortField::translate(&sort.name)?;
            field_sorts.push(FieldSort::new(field, sort.order));
            sorts.push(field.to_string());
        }

        let query = if sorts.is_empty() {
            Self::popularity(Query::Bool(root))
        } else {
            Query::Bool(root)
        };

        let mut request = SearchRequest::new(query)
            .with_size(criteria.limit + criteria.offset + 1)
            .with_from(0)
            .with_min_score(0.0);
        for sort in field_sorts {
            request = request.with_sort(sort);
        }

        tracing::debug!(
            sorts = ?sorts,
            size = request.size,
            only_private = criteria.only_private,
            "Built relevance query"
        );

        Ok(BuiltQuery { request, sorts })
    }

    /// One `type == searcher AND clause` wrapper per searcher, OR'd
    fn per_type(&self, clause: &Query, base_boost: f64) -> Query {
        let mut group = BoolQuery::new();
        for searcher in &self.searchers {
            group = group.should(Query::Bool(
                BoolQuery::new()
                    .filter(Query::term("type", searcher.content_type.as_str()))
                    .must(clause.with_boost(base_boost * searcher.boost)),
            ));
        }
        Query::Bool(group)
    }

    fn visibility(&self, actor: &Actor, only_private: bool) -> Query {
        let groups = actor.search_groups();

        let public = Query::Bool(
            BoolQuery::new()
                .filter(Query::term("is_private", false))
                .filter(Query::terms("groups", groups.iter().copied())),
        );

        if !self.config.private_messaging || actor.is_guest() {
            return public;
        }

        let private = Query::Bool(
            BoolQuery::new()
                .filter(Query::term("is_private", true))
                .filter(Query::Bool(
                    BoolQuery::new()
                        .should(Query::terms("recipient_groups", groups.iter().copied()))
                        .should(Query::terms("recipient_users", [actor.id])),
                )),
        );

        if only_private {
            private
        } else {
            Query::Bool(BoolQuery::new().should(public).should(private))
        }
    }

    /// Scale relevance by `0.1 + ln(1 + 0.1 * views)` so content without views
    /// keeps a non-zero score
    fn popularity(query: Query) -> Query {
        Query::FunctionScore {
            query: Box::new(query),
            functions: vec![
                ScoreFunction::FieldValueFactor {
                    field: "view_count".to_string(),
                    factor: 0.1,
                    modifier: Modifier::Ln1p,
                    missing: Some(0.1),
                },
                ScoreFunction::Weight(0.1),
            ],
            score_mode: ScoreMode::Sum,
            boost_mode: ScoreMode::Multiply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::SearchConfigBuilder;
    use serde_json::json;

    fn builder(private_messaging: bool) -> RelevanceQueryBuilder {
        RelevanceQueryBuilder::new(
            SearchConfigBuilder::new()
                .private_messaging(private_messaging)
                .build(),
            vec![Searcher::new("discussions", 1.0), Searcher::new("posts", 2.0)],
        )
    }

    fn root_bool(built: &BuiltQuery) -> BoolQuery {
        let query = match &built.request.query {
            Query::FunctionScore { query, .. } => query.as_ref(),
            other => other,
        };
        match query {
            Query::Bool(b) => b.clone(),
            other => panic!("unexpected root query: {:?}", other),
        }
    }

    #[test]
    fn test_parse_strips_private_directive() {
        let criteria = SearchCriteria::parse("install  is:private error");
        assert_eq!(criteria.text.as_deref(), Some("install error"));
        assert!(criteria.only_private);

        let criteria = SearchCriteria::parse("is:private");
        assert_eq!(criteria.text, None);
        assert!(criteria.only_private);
    }

    #[test]
    fn test_sort_parsing_and_translation() {
        let sorts = SortField::parse_list("-lastPostedAt,createdAt");
        assert_eq!(sorts[0].order, SortOrder::Descending);
        assert_eq!(sorts[1].name, "createdAt");
        assert_eq!(SortField::translate("commentCount").unwrap(), "comment_count");
        assert!(matches!(
            SortField::translate("title"),
            Err(SearchError::InvalidSort(_))
        ));
    }

    fn text_fields(value: &serde_json::Value, fields: &mut Vec<String>) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, inner) in map {
                    if key == "match" || key == "match_phrase" {
                        if let Some(clause) = inner.as_object() {
                            fields.extend(clause.keys().cloned());
                        }
                    }
                    text_fields(inner, fields);
                }
            }
            serde_json::Value::Array(items) => {
                items.iter().for_each(|item| text_fields(item, fields));
            }
            _ => {}
        }
    }

    #[test]
    fn test_text_clauses_hit_prefix_analyzed_fields() {
        let criteria = SearchCriteria::parse("instal").with_page(20, 0);
        let built = builder(false).build(&criteria, &Actor::guest()).unwrap();

        let mut fields = Vec::new();
        text_fields(&built.request.to_json(), &mut fields);
        assert!(!fields.is_empty());

        let mapping = crate::search::schema::document_mapping();
        for field in fields {
            assert_eq!(
                mapping["properties"][field.as_str()]["analyzer"],
                crate::search::schema::PARTIAL_ANALYZER,
                "{} is not prefix analyzed",
                field
            );
        }
    }

    #[test]
    fn test_text_clauses_are_scoped_per_type() {
        let criteria = SearchCriteria::parse("install error").with_page(20, 0);
        let built = builder(false).build(&criteria, &Actor::guest()).unwrap();
        let root = root_bool(&built);

        assert_eq!(root.should.len(), 3);
        assert_eq!(root.minimum_should_match, Some(1));

        let and_group = root.should[1].to_json();
        assert_eq!(
            and_group["bool"]["should"][1],
            json!({
                "bool": {
                    "must": [{ "match": { "content": { "query": "install error", "operator": "and", "boost": 3.6 } } }],
                    "filter": [{ "term": { "type": "posts" } }]
                }
            })
        );
    }

    #[test]
    fn test_overfetch_and_default_scoring() {
        let criteria = SearchCriteria::parse("install").with_page(20, 40);
        let built = builder(false).build(&criteria, &Actor::guest()).unwrap();

        assert_eq!(built.request.size, 61);
        assert_eq!(built.request.from, 0);
        assert_eq!(built.request.min_score, Some(0.0));
        assert!(built.sorts.is_empty());
        assert!(matches!(built.request.query, Query::FunctionScore { .. }));
    }

    #[test]
    fn test_explicit_sort_skips_function_score() {
        let criteria = SearchCriteria::parse("install")
            .with_sort(SortField::parse_list("-lastPostedAt"));
        let built = builder(false).build(&criteria, &Actor::guest()).unwrap();

        assert_eq!(built.sorts, vec!["updated_at".to_string()]);
        assert!(matches!(built.request.query, Query::Bool(_)));
        assert_eq!(built.request.sort[0].field, "updated_at");
    }

    #[test]
    fn test_unknown_sort_is_rejected() {
        let criteria = SearchCriteria::parse("install")
            .with_sort(SortField::parse_list("title"));
        let err = builder(false).build(&criteria, &Actor::guest()).unwrap_err();
        assert!(matches!(err, SearchError::InvalidSort(field) if field == "title"));
    }

    #[test]
    fn test_guest_only_gets_public_clause() {
        let criteria = SearchCriteria::parse("hello");
        let built = builder(true).build(&criteria, &Actor::guest()).unwrap();
        let visibility = root_bool(&built).filter.last().unwrap().to_json();

        assert_eq!(
            visibility,
            json!({
                "bool": {
                    "filter": [
                        { "term": { "is_private": false } },
                        { "terms": { "groups": [2] } }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_private_directive_uses_recipient_clause_only() {
        let actor = Actor::user(5, vec![]);
        let criteria = SearchCriteria::parse("hello is:private");
        let built = builder(true).build(&criteria, &actor).unwrap();
        let visibility = root_bool(&built).filter.last().unwrap().to_json();

        assert_eq!(visibility["bool"]["filter"][0], json!({ "term": { "is_private": true } }));
        assert_eq!(
            visibility["bool"]["filter"][1]["bool"]["should"][1],
            json!({ "terms": { "recipient_users": [5] } })
        );

        let criteria = SearchCriteria::parse("hello");
        let built = builder(true).build(&criteria, &actor).unwrap();
        let visibility = root_bool(&built).filter.last().unwrap().to_json();
        assert_eq!(visibility["bool"]["should"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_tag_filter() {
        let criteria = SearchCriteria::parse("").with_tag(Some(9));
        let built = builder(false).build(&criteria, &Actor::guest()).unwrap();
        let root = root_bool(&built);

        assert!(root.should.is_empty());
        assert_eq!(root.minimum_should_match, None);
        assert_eq!(root.filter[0].to_json(), json!({ "term": { "tags": 9 } }));
    }
}
