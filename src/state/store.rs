use crate::error::Result;
use crate::models::{CommentRow, Discussion, Post};
use crate::state::{ForumStore, WindowQuery};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// In-memory forum store (for development, snapshots and testing)
#[derive(Clone, Default)]
pub struct InMemoryForumStore {
    discussions: Arc<DashMap<i64, Discussion>>,
    posts: Arc<DashMap<i64, Post>>,
    tags: Arc<DashMap<String, i64>>,
}

impl InMemoryForumStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_discussion(&self, discussion: Discussion) {
        tracing::trace!(discussion_id = discussion.id, "Discussion stored");
        self.discussions.insert(discussion.id, discussion);
    }

    pub fn insert_post(&self, post: Post) {
        tracing::trace!(post_id = post.id, "Post stored");
        self.posts.insert(post.id, post);
    }

    pub fn insert_tag(&self, slug: impl Into<String>, id: i64) {
        self.tags.insert(slug.into(), id);
    }

    pub fn discussion(&self, id: i64) -> Option<Discussion> {
        self.discussions.get(&id).map(|entry| entry.clone())
    }

    pub fn post(&self, id: i64) -> Option<Post> {
        self.posts.get(&id).map(|entry| entry.clone())
    }

    pub fn remove_discussion(&self, id: i64) -> Option<Discussion> {
        self.discussions.remove(&id).map(|(_, discussion)| discussion)
    }

    pub fn remove_post(&self, id: i64) -> Option<Post> {
        self.posts.remove(&id).map(|(_, post)| post)
    }

    /// Join a post with its discussion
    pub fn comment_row(&self, post: Post) -> CommentRow {
        let discussion = self.discussion(post.discussion_id);
        CommentRow { post, discussion }
    }
}

#[async_trait]
impl ForumStore for InMemoryForumStore {
    async fn max_discussion_id(&self) -> Result<Option<i64>> {
        Ok(self.discussions.iter().map(|entry| *entry.key()).max())
    }

    async fn max_comment_id(&self) -> Result<Option<i64>> {
        Ok(self
            .posts
            .iter()
            .filter(|entry| entry.is_comment())
            .map(|entry| *entry.key())
            .max())
    }

    async fn discussions_in_window(&self, window: &WindowQuery) -> Result<Vec<Discussion>> {
        let mut rows: Vec<Discussion> = self
            .discussions
            .iter()
            .filter(|entry| !entry.is_hidden() && window.accepts(entry.id))
            .map(|entry| entry.clone())
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn comments_in_window(&self, window: &WindowQuery) -> Result<Vec<CommentRow>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| entry.is_comment() && !entry.is_hidden() && window.accepts(entry.id))
            .map(|entry| entry.clone())
            .collect();
        posts.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(posts.into_iter().map(|post| self.comment_row(post)).collect())
    }

    async fn discussions_matching(
        &self,
        discussion_ids: &[i64],
        post_ids: &[i64],
        include_hidden: bool,
    ) -> Result<Vec<Discussion>> {
        let mut ids: HashSet<i64> = discussion_ids.iter().copied().collect();
        ids.extend(
            post_ids
                .iter()
                .filter_map(|id| self.posts.get(id).map(|post| post.discussion_id)),
        );

        let mut rows: Vec<Discussion> = ids
            .into_iter()
            .filter_map(|id| self.discussion(id))
            .filter(|discussion| include_hidden || !discussion.is_hidden())
            .collect();
        rows.sort_by_key(|discussion| discussion.id);
        Ok(rows)
    }

    async fn first_post_among(&self, discussion_id: i64, post_ids: &[i64]) -> Result<Option<Post>> {
        Ok(post_ids
            .iter()
            .filter_map(|id| self.post(*id))
            .filter(|post| post.discussion_id == discussion_id)
            .min_by_key(|post| post.id))
    }

    async fn posts_by_ids(&self, ids: &[i64]) -> Result<Vec<Post>> {
        Ok(ids.iter().filter_map(|id| self.post(*id)).collect())
    }

    async fn tag_id_for_slug(&self, slug: &str) -> Result<Option<i64>> {
        Ok(self.tags.get(slug).map(|entry| *entry))
    }
}
