//! Search-engine query tree
//!
//! Queries are built as immutable values and serialised once into the
//! Elasticsearch query DSL.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Word-match operator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    And,
    Or,
}

/// Sort order for search results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Engine-side sort on a document field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSort {
    pub field: String,
    pub order: SortOrder,
}

impl FieldSort {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    fn to_json(&self) -> Value {
        json!({ &self.field: { "order": self.order.as_str() } })
    }
}

/// Bounds of a numeric range clause
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<f64>,
    pub gte: Option<f64>,
    pub lt: Option<f64>,
    pub lte: Option<f64>,
}

/// `field_value_factor` modifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    None,
    Ln1p,
    Log1p,
}

/// A scoring function inside `function_score`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ScoreFunction {
    /// `modifier(factor * doc[field])`, `missing` used when the field is absent
    FieldValueFactor {
        field: String,
        factor: f64,
        modifier: Modifier,
        missing: Option<f64>,
    },

    /// Constant contribution
    Weight(f64),
}

impl ScoreFunction {
    fn to_json(&self) -> Value {
        match self {
            ScoreFunction::FieldValueFactor {
                field,
                factor,
                modifier,
                missing,
            } => {
                let mut fvf = json!({
                    "field": field,
                    "factor": factor,
                    "modifier": modifier,
                });
                if let Some(missing) = missing {
                    fvf["missing"] = json!(missing);
                }
                json!({ "field_value_factor": fvf })
            }
            ScoreFunction::Weight(weight) => json!({ "weight": weight }),
        }
    }
}

/// How function results combine with each other / with the query score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    Multiply,
    Sum,
}

/// Boolean combination of clauses
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub filter: Vec<Query>,
    pub minimum_should_match: Option<u32>,
    pub boost: Option<f64>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    pub fn minimum_should_match(mut self, count: u32) -> Self {
        self.minimum_should_match = Some(count);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.filter.is_empty()
    }

    /// Effective `minimum_should_match`, using the engine's defaults when
    /// none is set: one should clause must match unless the bool also has
    /// must or filter clauses.
    pub fn effective_minimum_should_match(&self) -> u32 {
        match self.minimum_should_match {
            Some(count) => count,
            None if self.should.is_empty() => 0,
            None if self.must.is_empty() && self.filter.is_empty() => 1,
            None => 0,
        }
    }
}

/// Query clause variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Query {
    /// Every document
    MatchAll,

    /// Exact phrase on an analyzed field
    MatchPhrase {
        field: String,
        text: String,
        boost: Option<f64>,
    },

    /// Word match joined with `operator`
    Match {
        field: String,
        text: String,
        operator: Operator,
        boost: Option<f64>,
    },

    /// Field equals (or array contains) a value
    Term { field: String, value: Value },

    /// Field equals (or array contains) any of the values
    Terms { field: String, values: Vec<Value> },

    /// Numeric range
    Range { field: String, bounds: RangeBounds },

    Bool(BoolQuery),

    /// Wraps a query with scoring functions
    FunctionScore {
        query: Box<Query>,
        functions: Vec<ScoreFunction>,
        score_mode: ScoreMode,
        boost_mode: ScoreMode,
    },
}

impl Query {
    pub fn match_phrase(field: impl Into<String>, text: impl Into<String>) -> Self {
        Query::MatchPhrase {
            field: field.into(),
            text: text.into(),
            boost: None,
        }
    }

    pub fn match_words(field: impl Into<String>, text: impl Into<String>, operator: Operator) -> Self {
        Query::Match {
            field: field.into(),
            text: text.into(),
            operator,
            boost: None,
        }
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Query::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        Query::Range {
            field: field.into(),
            bounds,
        }
    }

    /// Copy of this clause with its boost replaced.
    ///
    /// Only full-text clauses and bool groups carry a boost; other clauses
    /// are returned unchanged.
    pub fn with_boost(&self, value: f64) -> Self {
        let mut query = self.clone();
        match &mut query {
            Query::MatchPhrase { boost, .. } | Query::Match { boost, .. } => *boost = Some(value),
            Query::Bool(bool_query) => bool_query.boost = Some(value),
            _ => {}
        }
        query
    }

    /// Serialise into the Elasticsearch query DSL
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::MatchPhrase { field, text, boost } => {
                let mut inner = json!({ "query": text });
                if let Some(boost) = boost {
                    inner["boost"] = json!(boost);
                }
                json!({ "match_phrase": { field: inner } })
            }
            Query::Match {
                field,
                text,
                operator,
                boost,
            } => {
                let mut inner = json!({ "query": text, "operator": operator });
                if let Some(boost) = boost {
                    inner["boost"] = json!(boost);
                }
                json!({ "match": { field: inner } })
            }
            Query::Term { field, value } => json!({ "term": { field: value } }),
            Query::Terms { field, values } => json!({ "terms": { field: values } }),
            Query::Range { field, bounds } => {
                let mut inner = Map::new();
                for (key, value) in [
                    ("gt", bounds.gt),
                    ("gte", bounds.gte),
                    ("lt", bounds.lt),
                    ("lte", bounds.lte),
                ] {
                    if let Some(value) = value {
                        inner.insert(key.to_string(), json!(value));
                    }
                }
                json!({ "range": { field: inner } })
            }
            Query::Bool(bool_query) => {
                let mut inner = Map::new();
                for (key, clauses) in [
                    ("must", &bool_query.must),
                    ("should", &bool_query.should),
                    ("filter", &bool_query.filter),
                ] {
                    if !clauses.is_empty() {
                        inner.insert(
                            key.to_string(),
                            Value::Array(clauses.iter().map(Query::to_json).collect()),
                        );
                    }
                }
                if let Some(count) = bool_query.minimum_should_match {
                    inner.insert("minimum_should_match".to_string(), json!(count));
                }
                if let Some(boost) = bool_query.boost {
                    inner.insert("boost".to_string(), json!(boost));
                }
                json!({ "bool": inner })
            }
            Query::FunctionScore {
                query,
                functions,
                score_mode,
                boost_mode,
            } => json!({
                "function_score": {
                    "query": query.to_json(),
                    "functions": functions.iter().map(ScoreFunction::to_json).collect::<Vec<_>>(),
                    "score_mode": score_mode,
                    "boost_mode": boost_mode,
                }
            }),
        }
    }
}

/// A complete search request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    pub sort: Vec<FieldSort>,
    pub size: usize,
    pub from: usize,
    pub min_score: Option<f64>,
}

impl SearchRequest {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            sort: Vec::new(),
            size: 10,
            from: 0,
            min_score: None,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_sort(mut self, sort: FieldSort) -> Self {
        self.sort.push(sort);
        self
    }

    /// Request body for the `_search` endpoint
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "query": self.query.to_json(),
            "size": self.size,
            "from": self.from,
        });
        if !self.sort.is_empty() {
            body["sort"] = Value::Array(self.sort.iter().map(FieldSort::to_json).collect());
        }
        if let Some(min_score) = self.min_score {
            body["min_score"] = json!(min_score);
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_serialization_skips_empty_sections() {
        let query = Query::Bool(
            BoolQuery::new()
                .filter(Query::term("type", "posts"))
                .must(Query::match_phrase("content", "install error").with_boost(0.4)),
        );

        assert_eq!(
            query.to_json(),
            json!({
                "bool": {
                    "must": [{ "match_phrase": { "content": { "query": "install error", "boost": 0.4 } } }],
                    "filter": [{ "term": { "type": "posts" } }]
                }
            })
        );
    }

    #[test]
    fn test_range_only_emits_given_bounds() {
        let query = Query::range(
            "rawId",
            RangeBounds {
                gt: Some(1000.0),
                lte: Some(2000.0),
                ..Default::default()
            },
        );
        assert_eq!(
            query.to_json(),
            json!({ "range": { "rawId": { "gt": 1000.0, "lte": 2000.0 } } })
        );
    }

    #[test]
    fn test_minimum_should_match_defaults() {
        let only_should = BoolQuery::new().should(Query::MatchAll);
        assert_eq!(only_should.effective_minimum_should_match(), 1);

        let with_filter = BoolQuery::new()
            .should(Query::MatchAll)
            .filter(Query::term("is_private", false));
        assert_eq!(with_filter.effective_minimum_should_match(), 0);

        let explicit = with_filter.minimum_should_match(1);
        assert_eq!(explicit.effective_minimum_should_match(), 1);
    }

    #[test]
    fn test_request_body() {
        let request = SearchRequest::new(Query::MatchAll)
            .with_size(21)
            .with_min_score(0.0)
            .with_sort(FieldSort::new("updated_at", SortOrder::Descending));

        let body = request.to_json();
        assert_eq!(body["size"], 21);
        assert_eq!(body["from"], 0);
        assert_eq!(body["sort"], json!([{ "updated_at": { "order": "desc" } }]));
        assert_eq!(body["min_score"], 0.0);
    }
}
