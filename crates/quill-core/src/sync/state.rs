use uuid::Uuid;

use crate::domain::Post;

/// Controller lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Not started yet.
    Uninitialized,
    /// Started, first refresh has not succeeded yet.
    Loading,
    /// At least one refresh succeeded.
    Ready,
}

/// Everything a consumer renders from.
#[derive(Debug, Clone)]
pub struct SyncSnapshot {
    /// All posts, newest first.
    pub posts: Vec<Post>,
    pub loading: bool,
    /// Description of the last failed refresh, cleared by the next successful one.
    pub error: Option<String>,
    pub phase: SyncPhase,
}

impl SyncSnapshot {
    pub fn find(&self, id: Uuid) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            loading: true,
            error: None,
            phase: SyncPhase::Uninitialized,
        }
    }
}
