//! In-process search engine for development and tests
//!
//! Evaluates the query tree directly against stored documents. Scoring is
//! deliberately simple: a matching full-text clause contributes its boost
//! and bool groups sum the scores of their matching clauses.

use crate::search::document::Document;
use crate::search::engine::{
    BulkItem, BulkItemError, BulkItemResult, BulkResponse, HitSource, HitsEnvelope, HitsTotal,
    RawHit, SearchEngine, SearchResponse,
};
use crate::search::error::SearchResult;
use crate::search::query::{
    BoolQuery, Modifier, Operator, Query, RangeBounds, ScoreFunction, ScoreMode, SearchRequest,
    SortOrder,
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

#[derive(Clone)]
struct Stored {
    seq: u64,
    source: Value,
    document: Document,
}

/// `SearchEngine` keeping documents in a concurrent map
#[derive(Clone, Default)]
pub struct InMemoryEngine {
    documents: Arc<DashMap<String, Stored>>,
    seq: Arc<AtomicU64>,
    rejections: Arc<DashMap<String, String>>,
    bulk_sizes: Arc<Mutex<Vec<usize>>>,
    settings: Arc<Mutex<Option<Value>>>,
    mapping: Arc<Mutex<Option<Value>>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make bulk requests reject the document with this id
    pub fn reject(&self, id: impl Into<String>, reason: impl Into<String>) {
        self.rejections.insert(id.into(), reason.into());
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.get(id).map(|entry| entry.document.clone())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of documents in each bulk request received so far
    pub fn bulk_sizes(&self) -> Vec<usize> {
        self.bulk_sizes.lock().clone()
    }

    pub fn index_settings(&self) -> Option<Value> {
        self.settings.lock().clone()
    }

    pub fn mapping(&self) -> Option<Value> {
        self.mapping.lock().clone()
    }
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    async fn bulk_upsert(&self, documents: &[Document], _refresh: bool) -> SearchResult<BulkResponse> {
        self.bulk_sizes.lock().push(documents.len());

        let mut response = BulkResponse::default();
        for document in documents {
            let result = match self.rejections.get(&document.id) {
                Some(reason) => {
                    response.errors = true;
                    BulkItemResult {
                        id: document.id.clone(),
                        status: 400,
                        error: Some(BulkItemError {
                            error_type: "mapper_parsing_exception".to_string(),
                            reason: reason.clone(),
                        }),
                    }
                }
                None => {
                    let source = serde_json::to_value(document)?;
                    let seq = self.seq.fetch_add(1, AtomicOrdering::SeqCst);
                    let status = match self.documents.insert(
                        document.id.clone(),
                        Stored {
                            seq,
                            source,
                            document: document.clone(),
                        },
                    ) {
                        Some(_) => 200,
                        None => 201,
                    };
                    BulkItemResult {
                        id: document.id.clone(),
                        status,
                        error: None,
                    }
                }
            };
            response.items.push(BulkItem { index: result });
        }
        Ok(response)
    }

    async fn delete_document(&self, id: &str) -> SearchResult<()> {
        self.documents.remove(id);
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        let mut matched: Vec<(u64, f64, Value)> = self
            .documents
            .iter()
            .filter_map(|entry| {
                let score = evaluate(&request.query, &entry.source)?;
                match request.min_score {
                    Some(min) if score < min => None,
                    _ => Some((entry.seq, score, entry.source.clone())),
                }
            })
            .collect();

        matched.sort_by_key(|(seq, _, _)| *seq);
        if request.sort.is_empty() {
            matched.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        } else {
            matched.sort_by(|a, b| {
                for sort in &request.sort {
                    let ordering = compare_values(a.2.get(&sort.field), b.2.get(&sort.field));
                    let ordering = match sort.order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let total = matched.len() as u64;
        let sorted = !request.sort.is_empty();
        let hits = matched
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(_, score, source)| {
                let hit_source: HitSource = serde_json::from_value(source).unwrap_or_default();
                RawHit {
                    id: hit_source.id.clone(),
                    score: if sorted { None } else { Some(score) },
                    source: hit_source,
                }
            })
            .collect();

        Ok(SearchResponse {
            hits: HitsEnvelope {
                total: Some(HitsTotal { value: total }),
                hits,
            },
        })
    }

    async fn delete_index(&self) -> SearchResult<()> {
        self.documents.clear();
        *self.settings.lock() = None;
        *self.mapping.lock() = None;
        Ok(())
    }

    async fn create_index(&self, settings: Value) -> SearchResult<()> {
        *self.settings.lock() = Some(settings);
        Ok(())
    }

    async fn put_mapping(&self, mapping: Value) -> SearchResult<()> {
        *self.mapping.lock() = Some(mapping);
        Ok(())
    }
}

/// Score of `query` against `source`, `None` when it does not match
fn evaluate(query: &Query, source: &Value) -> Option<f64> {
    match query {
        Query::MatchAll => Some(1.0),
        Query::MatchPhrase { field, text, boost } => {
            let haystack = tokenize(source.get(field)?.as_str()?);
            let needle = tokenize(text);
            if needle.is_empty() || !haystack.windows(needle.len()).any(|w| w == needle.as_slice()) {
                return None;
            }
            Some(boost.unwrap_or(1.0))
        }
        Query::Match {
            field,
            text,
            operator,
            boost,
        } => {
            let haystack = tokenize(source.get(field)?.as_str()?);
            let needle = tokenize(text);
            if needle.is_empty() {
                return None;
            }
            let found = needle.iter().filter(|token| haystack.contains(token)).count();
            let fraction = found as f64 / needle.len() as f64;
            let matches = match operator {
                Operator::And => found == needle.len(),
                Operator::Or => found > 0,
            };
            matches.then(|| boost.unwrap_or(1.0) * fraction)
        }
        Query::Term { field, value } => contains(source.get(field)?, value).then_some(0.0),
        Query::Terms { field, values } => {
            let field_value = source.get(field)?;
            values
                .iter()
                .any(|value| contains(field_value, value))
                .then_some(0.0)
        }
        Query::Range { field, bounds } => {
            in_range(source.get(field)?.as_f64()?, bounds).then_some(0.0)
        }
        Query::Bool(bool_query) => evaluate_bool(bool_query, source),
        Query::FunctionScore {
            query,
            functions,
            score_mode,
            boost_mode,
        } => {
            let score = evaluate(query, source)?;
            let values = functions.iter().map(|function| apply(function, source));
            let combined = match score_mode {
                ScoreMode::Sum => values.sum::<f64>(),
                ScoreMode::Multiply => values.product::<f64>(),
            };
            Some(match boost_mode {
                ScoreMode::Multiply => score * combined,
                ScoreMode::Sum => score + combined,
            })
        }
    }
}

fn evaluate_bool(query: &BoolQuery, source: &Value) -> Option<f64> {
    if !query.filter.iter().all(|clause| evaluate(clause, source).is_some()) {
        return None;
    }

    let mut score = 0.0;
    for clause in &query.must {
        score += evaluate(clause, source)?;
    }

    let mut should_matches = 0;
    for clause in &query.should {
        if let Some(clause_score) = evaluate(clause, source) {
            should_matches += 1;
            score += clause_score;
        }
    }
    if should_matches < query.effective_minimum_should_match() {
        return None;
    }

    Some(score * query.boost.unwrap_or(1.0))
}

fn apply(function: &ScoreFunction, source: &Value) -> f64 {
    match function {
        ScoreFunction::Weight(weight) => *weight,
        ScoreFunction::FieldValueFactor {
            field,
            factor,
            modifier,
            missing,
        } => {
            let value = source
                .get(field)
                .and_then(Value::as_f64)
                .or(*missing)
                .unwrap_or(0.0);
            let scaled = factor * value;
            match modifier {
                Modifier::None => scaled,
                Modifier::Ln1p => scaled.ln_1p(),
                Modifier::Log1p => (1.0 + scaled).log10(),
            }
        }
    }
}

/// Field equals the value, or is an array containing it
fn contains(field: &Value, value: &Value) -> bool {
    match field {
        Value::Array(items) => items.iter().any(|item| scalar_eq(item, value)),
        other => scalar_eq(other, value),
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn in_range(value: f64, bounds: &RangeBounds) -> bool {
    bounds.gt.map_or(true, |b| value > b)
        && bounds.gte.map_or(true, |b| value >= b)
        && bounds.lt.map_or(true, |b| value < b)
        && bounds.lte.map_or(true, |b| value <= b)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Less,
        (_, Some(Value::Null) | None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}
