use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SyncError;

/// Post entity - a blog post as stored in the `posts` table.
///
/// `id`, `created_at` and `updated_at` are assigned by the remote store.
/// `author` and `user_id` are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: String,
    /// Owning identity. `None` for posts written before ownership was recorded.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Whether `user_id` may edit or delete this post.
    ///
    /// Posts without an owner are never editable.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }
}

/// Validated input for a new post, before an owner is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub author: String,
}

impl PostDraft {
    /// Trim and validate creation input.
    pub fn new(title: &str, content: &str, author: &str) -> Result<Self, SyncError> {
        Ok(Self {
            title: required("title", title)?,
            content: required("content", content)?,
            author: required("author", author)?,
        })
    }

    /// Attach the creating identity, producing the row to insert.
    pub fn owned_by(self, user_id: Uuid) -> NewPost {
        NewPost {
            title: self.title,
            content: self.content,
            author: self.author,
            user_id,
        }
    }
}

/// Row sent to the store on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author: String,
    pub user_id: Uuid,
}

/// Editable columns of an existing post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostPatch {
    pub title: String,
    pub content: String,
}

impl PostPatch {
    /// Trim and validate update input.
    pub fn new(title: &str, content: &str) -> Result<Self, SyncError> {
        Ok(Self {
            title: required("title", title)?,
            content: required("content", content)?,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, SyncError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyncError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
