//! Maps engine hits back onto discussions
//!
//! Hits are split into an already consumed prefix (`offset`) and the current
//! page. Discussions reached by the prefix are excluded from the page, so a
//! discussion matched through several posts shows up once across pages.

use crate::models::{Actor, ContentType, Discussion, Post};
use crate::search::engine::SearchHit;
use crate::search::error::{SearchError, SearchResult};
use crate::state::ForumStore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A discussion augmented with its search relevance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRow {
    pub discussion: Discussion,

    /// The post that made the discussion match, its first post otherwise
    pub most_relevant_post_id: Option<i64>,

    /// Engine relevance score
    pub weight: f64,

    /// Secondary ranking key, only set when explicit sorts were requested
    pub filter_weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_post: Option<Post>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_post: Option<Post>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_relevant_post: Option<Post>,
}

/// Relations that can be attached to result rows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Include {
    FirstPost,
    LastPost,
    MostRelevantPost,
}

impl Include {
    /// Parse the API include name; unknown names are ignored
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "firstPost" => Some(Include::FirstPost),
            "lastPost" => Some(Include::LastPost),
            "mostRelevantPost" => Some(Include::MostRelevantPost),
            _ => None,
        }
    }

    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',').filter_map(|name| Self::parse(name.trim())).collect()
    }
}

/// One page of merged results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MergedResults {
    pub rows: Vec<ResultRow>,

    /// More hits exist beyond this page
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy)]
enum HitRef {
    Discussion { id: i64, weight: f64 },
    Post { id: i64, weight: f64 },
}

impl HitRef {
    fn from_hit(hit: &SearchHit) -> Self {
        if ContentType::is_post(&hit.doc_type) {
            HitRef::Post {
                id: hit.raw_id,
                weight: hit.score,
            }
        } else {
            HitRef::Discussion {
                id: hit.raw_id,
                weight: hit.score,
            }
        }
    }
}

/// Splits hit references into discussion ids and post ids
fn split_ids(hits: &[HitRef]) -> (Vec<i64>, Vec<i64>) {
    let mut discussions = Vec::new();
    let mut posts = Vec::new();
    for hit in hits {
        match hit {
            HitRef::Discussion { id, .. } => discussions.push(*id),
            HitRef::Post { id, .. } => posts.push(*id),
        }
    }
    (discussions, posts)
}

/// Re-hydrates hits into ranked discussion rows
pub struct ResultMerger {
    store: Arc<dyn ForumStore>,
}

impl ResultMerger {
    pub fn new(store: Arc<dyn ForumStore>) -> Self {
        Self { store }
    }

    /// Merge one page of hits.
    ///
    /// `sorts` are the translated sort fields the query used; when empty,
    /// rows are ranked by engine score.
    pub async fn merge(
        &self,
        hits: &[SearchHit],
        offset: usize,
        limit: usize,
        sorts: &[String],
        actor: &Actor,
    ) -> SearchResult<MergedResults> {
        let refs: Vec<HitRef> = hits.iter().map(HitRef::from_hit).collect();
        let prior: Vec<HitRef> = refs.iter().take(offset).copied().collect();
        let latter: Vec<HitRef> = refs.iter().skip(offset).take(limit).copied().collect();
        let include_hidden = actor.may_view_hidden();

        let (prior_discussions, prior_posts) = split_ids(&prior);
        let excluded: HashSet<i64> = if prior.is_empty() {
            HashSet::new()
        } else {
            self.store
                .discussions_matching(&prior_discussions, &prior_posts, include_hidden)
                .await?
                .into_iter()
                .map(|discussion| discussion.id)
                .collect()
        };

        let (latter_discussions, latter_posts) = split_ids(&latter);
        let discussions = if latter.is_empty() {
            Vec::new()
        } else {
            self.store
                .discussions_matching(&latter_discussions, &latter_posts, include_hidden)
                .await?
        };

        let mut discussion_hits: HashMap<i64, (usize, f64)> = HashMap::new();
        let mut post_hits: HashMap<i64, (usize, f64)> = HashMap::new();
        for (position, hit) in latter.iter().enumerate() {
            match *hit {
                HitRef::Discussion { id, weight } => {
                    discussion_hits.entry(id).or_insert((position, weight));
                }
                HitRef::Post { id, weight } => {
                    post_hits.entry(id).or_insert((position, weight));
                }
            }
        }

        let mut ranked: Vec<(usize, ResultRow)> = Vec::with_capacity(discussions.len());
        let mut seen = HashSet::new();
        for discussion in discussions {
            if excluded.contains(&discussion.id) || !seen.insert(discussion.id) {
                continue;
            }

            let (position, most_relevant_post_id, weight) =
                match discussion_hits.get(&discussion.id) {
                    Some((position, weight)) => (*position, discussion.first_post_id, *weight),
                    None => {
                        let post = self
                            .store
                            .first_post_among(discussion.id, &latter_posts)
                            .await?;
                        match post.and_then(|post| post_hits.get(&post.id).map(|hit| (post.id, *hit))) {
                            Some((post_id, (position, weight))) => (position, Some(post_id), weight),
                            None => (usize::MAX, discussion.first_post_id, 0.0),
                        }
                    }
                };

            let filter_weight = if sorts.is_empty() {
                None
            } else {
                Some(Self::filter_weight(&discussion, sorts)?)
            };

            ranked.push((
                position,
                ResultRow {
                    discussion,
                    most_relevant_post_id,
                    weight,
                    filter_weight,
                    first_post: None,
                    last_post: None,
                    most_relevant_post: None,
                },
            ));
        }

        ranked.sort_by_key(|(position, _)| *position);
        let mut rows: Vec<ResultRow> = ranked.into_iter().map(|(_, row)| row).collect();
        if sorts.is_empty() {
            rows.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
        } else {
            rows.sort_by(|a, b| {
                b.filter_weight
                    .partial_cmp(&a.filter_weight)
                    .unwrap_or(Ordering::Equal)
            });
        }

        tracing::debug!(
            hits = hits.len(),
            excluded = excluded.len(),
            rows = rows.len(),
            "Merged search hits"
        );

        Ok(MergedResults {
            rows,
            has_more: hits.len() > limit,
        })
    }

    /// Sum of the requested sort keys for one discussion
    pub fn filter_weight(discussion: &Discussion, sorts: &[String]) -> SearchResult<f64> {
        sorts.iter().try_fold(0.0, |total, field| {
            let value = match field.as_str() {
                "updated_at" => discussion.last_activity().timestamp() as f64,
                "created_at" => discussion.created_at.timestamp() as f64,
                "comment_count" => discussion.comment_count as f64,
                "view_count" => discussion.view_count as f64,
                other => return Err(SearchError::InvalidSort(other.to_string())),
            };
            Ok(total + value)
        })
    }

    /// Attach requested post relations once ranking is final
    pub async fn load_relations(
        &self,
        rows: &mut [ResultRow],
        includes: &[Include],
    ) -> SearchResult<()> {
        if includes.is_empty() || rows.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::new();
        for row in rows.iter() {
            for include in includes {
                let id = match include {
                    Include::FirstPost => row.discussion.first_post_id,
                    Include::LastPost => row.discussion.last_post_id,
                    Include::MostRelevantPost => row.most_relevant_post_id,
                };
                ids.extend(id);
            }
        }
        ids.sort_unstable();
        ids.dedup();

        let posts: HashMap<i64, Post> = self
            .store
            .posts_by_ids(&ids)
            .await?
            .into_iter()
            .map(|post| (post.id, post))
            .collect();
        let lookup = |id: Option<i64>| id.and_then(|id| posts.get(&id).cloned());

        for row in rows.iter_mut() {
            for include in includes {
                match include {
                    Include::FirstPost => row.first_post = lookup(row.discussion.first_post_id),
                    Include::LastPost => row.last_post = lookup(row.discussion.last_post_id),
                    Include::MostRelevantPost => {
                        row.most_relevant_post = lookup(row.most_relevant_post_id)
                    }
                }
            }
        }

        Ok(())
    }
}
