//! Remote store port - row access to the `posts` table.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewPost, Post, PostPatch};
use crate::error::StoreError;

/// Name of the table holding posts.
pub const POSTS_TABLE: &str = "posts";

/// Column every full-table select is ordered by.
pub const ORDER_COLUMN: &str = "created_at";

/// Direction of a full-table select over `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub descending: bool,
}

impl OrderBy {
    /// `created_at` descending - the order of every snapshot.
    pub fn newest_first() -> Self {
        Self { descending: true }
    }
}

/// Row predicate for guarded mutations.
///
/// `owner`, when set, must match the row's `user_id` for the row to be affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFilter {
    pub id: Uuid,
    pub owner: Option<Uuid>,
}

impl RowFilter {
    pub fn id(id: Uuid) -> Self {
        Self { id, owner: None }
    }

    pub fn owned_by(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Whether a row passes this filter.
    pub fn matches(&self, post: &Post) -> bool {
        post.id == self.id && self.owner.is_none_or(|owner| post.user_id == Some(owner))
    }
}

/// Post store trait - abstraction over the hosted row store.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Fetch every post in the given order.
    async fn select_all(&self, order: OrderBy) -> Result<Vec<Post>, StoreError>;

    /// Fetch a single post by id.
    async fn select_one(&self, id: Uuid) -> Result<Option<Post>, StoreError>;

    /// Insert a new row. The store assigns id and timestamps.
    async fn insert(&self, row: NewPost) -> Result<(), StoreError>;

    /// Apply `patch` to the rows matching `filter`. Returns rows affected.
    async fn update(&self, patch: PostPatch, filter: RowFilter) -> Result<u64, StoreError>;

    /// Permanently remove the rows matching `filter`. Returns rows affected.
    async fn delete(&self, filter: RowFilter) -> Result<u64, StoreError>;
}
