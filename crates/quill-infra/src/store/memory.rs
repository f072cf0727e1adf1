//! In-memory post store - used when no database is configured, and in tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{NewPost, Post, PostPatch};
use quill_core::error::StoreError;
use quill_core::ports::{
    ChangeEvent, ChangeKind, ChangePublisher, OrderBy, POSTS_TABLE, PostStore, RowFilter,
};

/// Posts held in insertion order behind an async RwLock.
///
/// Note: Data is lost on process restart.
pub struct InMemoryPostStore {
    rows: RwLock<Vec<Post>>,
    publisher: Option<Arc<dyn ChangePublisher>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            publisher: None,
        }
    }

    /// Seed the store with existing rows, e.g. legacy posts without an owner.
    pub fn with_rows(rows: Vec<Post>) -> Self {
        Self {
            rows: RwLock::new(rows),
            publisher: None,
        }
    }

    /// Announce every successful write on `publisher`.
    pub fn with_publisher(mut self, publisher: Arc<dyn ChangePublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    async fn announce(&self, kind: ChangeKind, row_id: Uuid) {
        if let Some(publisher) = &self.publisher {
            let event = ChangeEvent::new(POSTS_TABLE, kind, Some(row_id));
            if let Err(e) = publisher.publish(&event).await {
                tracing::warn!(error = %e, post_id = %row_id, "Failed to publish post change");
            }
        }
    }
}

impl Default for InMemoryPostStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn select_all(&self, order: OrderBy) -> Result<Vec<Post>, StoreError> {
        // Newest insert first so equal sort keys keep the most recent row on top
        let mut posts: Vec<Post> = self.rows.read().await.iter().rev().cloned().collect();

        posts.sort_by(|a, b| {
            let ordering = a.created_at.cmp(&b.created_at);
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        Ok(posts)
    }

    async fn select_one(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|post| post.id == id).cloned())
    }

    async fn insert(&self, row: NewPost) -> Result<(), StoreError> {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: row.title,
            content: row.content,
            author: row.author,
            user_id: Some(row.user_id),
            created_at: now,
            updated_at: now,
        };
        let id = post.id;

        self.rows.write().await.push(post);
        tracing::debug!(post_id = %id, "Post inserted");

        self.announce(ChangeKind::Insert, id).await;
        Ok(())
    }

    async fn update(&self, patch: PostPatch, filter: RowFilter) -> Result<u64, StoreError> {
        let affected = {
            let mut rows = self.rows.write().await;
            let mut affected = 0;
            for post in rows.iter_mut().filter(|post| filter.matches(post)) {
                post.title = patch.title.clone();
                post.content = patch.content.clone();
                post.updated_at = Utc::now();
                affected += 1;
            }
            affected
        };

        if affected > 0 {
            self.announce(ChangeKind::Update, filter.id).await;
        }
        Ok(affected)
    }

    async fn delete(&self, filter: RowFilter) -> Result<u64, StoreError> {
        let affected = {
            let mut rows = self.rows.write().await;
            let before = rows.len();
            rows.retain(|post| !filter.matches(post));
            (before - rows.len()) as u64
        };

        if affected > 0 {
            self.announce(ChangeKind::Delete, filter.id).await;
        }
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quill_core::domain::PostDraft;

    fn draft(title: &str, owner: Uuid) -> NewPost {
        PostDraft::new(title, "Content", "Alice")
            .unwrap()
            .owned_by(owner)
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_owner() {
        let store = InMemoryPostStore::new();
        let owner = Uuid::new_v4();

        store.insert(draft("First", owner)).await.unwrap();

        let posts = store.select_all(OrderBy::newest_first()).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].user_id, Some(owner));
        assert_eq!(posts[0].created_at, posts[0].updated_at);
    }

    #[tokio::test]
    async fn test_select_all_newest_first() {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let mut old = draft_post("old", now - Duration::hours(2));
        old.user_id = Some(owner);
        let store = InMemoryPostStore::with_rows(vec![draft_post("new", now), old]);

        let posts = store.select_all(OrderBy::newest_first()).await.unwrap();

        assert_eq!(posts[0].title, "new");
        assert_eq!(posts[1].title, "old");
    }

    #[tokio::test]
    async fn test_guarded_update_requires_matching_owner() {
        let store = InMemoryPostStore::new();
        let owner = Uuid::new_v4();
        store.insert(draft("Mine", owner)).await.unwrap();
        let id = store.select_all(OrderBy::newest_first()).await.unwrap()[0].id;
        let patch = PostPatch::new("Changed", "Body").unwrap();

        let stranger = RowFilter::id(id).owned_by(Uuid::new_v4());
        assert_eq!(store.update(patch.clone(), stranger).await.unwrap(), 0);

        let guarded = RowFilter::id(id).owned_by(owner);
        assert_eq!(store.update(patch, guarded).await.unwrap(), 1);

        let post = store.select_one(id).await.unwrap().unwrap();
        assert_eq!(post.title, "Changed");
        assert_eq!(post.author, "Alice");
        assert!(post.updated_at >= post.created_at);
    }

    #[tokio::test]
    async fn test_guarded_delete_skips_unowned_rows() {
        let legacy = draft_post("legacy", Utc::now());
        let id = legacy.id;
        let store = InMemoryPostStore::with_rows(vec![legacy]);

        let affected = store
            .delete(RowFilter::id(id).owned_by(Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(affected, 0);
        assert_eq!(store.len().await, 1);
    }

    fn draft_post(title: &str, at: chrono::DateTime<Utc>) -> Post {
        Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: "Content".to_string(),
            author: "Bob".to_string(),
            user_id: None,
            created_at: at,
            updated_at: at,
        }
    }
}
