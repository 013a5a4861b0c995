use crate::error::{AppError, Result};
use crate::models::ContentType;
use crate::search::{SearchConfig, Searcher};
use crate::seeders::{CommentSeeder, DiscussionSeeder, Seeder, SeederOptions};
use crate::state::ForumStore;
use std::sync::Arc;

/// The content types known to the pipeline, in registration order
#[derive(Clone, Default)]
pub struct SeederRegistry {
    seeders: Vec<Arc<dyn Seeder>>,
}

impl SeederRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discussions and comments over one forum store
    pub fn forum(store: Arc<dyn ForumStore>, options: SeederOptions) -> Self {
        Self::new()
            .register(Arc::new(DiscussionSeeder::new(store.clone(), options)))
            .register(Arc::new(CommentSeeder::new(store, options)))
    }

    /// Discussions and comments weighted by `search.boosts`
    pub fn from_config(store: Arc<dyn ForumStore>, config: &SearchConfig) -> Self {
        let options = SeederOptions::from(config);
        Self::new()
            .register(Arc::new(
                DiscussionSeeder::new(store.clone(), options)
                    .with_boost(config.boost_for(ContentType::DISCUSSIONS)),
            ))
            .register(Arc::new(
                CommentSeeder::new(store, options).with_boost(config.boost_for(ContentType::POSTS)),
            ))
    }

    pub fn register(mut self, seeder: Arc<dyn Seeder>) -> Self {
        self.seeders.push(seeder);
        self
    }

    pub fn get(&self, content_type: &str) -> Option<Arc<dyn Seeder>> {
        self.seeders
            .iter()
            .find(|seeder| seeder.content_type() == content_type)
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Seeder>> {
        self.seeders.iter()
    }

    pub fn len(&self) -> usize {
        self.seeders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeders.is_empty()
    }

    /// Seeders selected by an optional `--only` filter
    pub fn only(&self, content_type: Option<&str>) -> Result<Vec<Arc<dyn Seeder>>> {
        match content_type {
            None => Ok(self.seeders.clone()),
            Some(content_type) => self
                .get(content_type)
                .map(|seeder| vec![seeder])
                .ok_or_else(|| {
                    AppError::Validation(format!("Unknown content type: {}", content_type))
                }),
        }
    }

    /// Text-matching participants for the query builder
    pub fn searchers(&self) -> Vec<Searcher> {
        self.seeders
            .iter()
            .map(|seeder| Searcher::new(seeder.content_type(), seeder.boost()))
            .collect()
    }
}
