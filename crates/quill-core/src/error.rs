//! Domain-level error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors reported by the post synchronization controller.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Post {0} is not owned by the current user")]
    NotOwner(Uuid),

    #[error("Post not found: {0}")]
    PostNotFound(Uuid),

    #[error("Remote operation failed: {0}")]
    RemoteOperationFailed(String),

    #[error("Failed to fetch posts: {0}")]
    FetchFailed(String),

    #[error("Failed to subscribe to changes: {0}")]
    SubscriptionFailed(String),
}

/// Remote store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    /// The store refused the operation (access policy, constraint, bad request).
    #[error("Rejected by store: {0}")]
    Rejected(String),

    #[error("Malformed row: {0}")]
    Decode(String),
}

impl StoreError {
    /// The message reported by the store, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            StoreError::Connection(msg)
            | StoreError::Query(msg)
            | StoreError::Rejected(msg)
            | StoreError::Decode(msg) => msg,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::RemoteOperationFailed(err.message().to_string())
    }
}

/// Change feed errors.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to publish: {0}")]
    PublishError(String),

    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    #[error("Connection error: {0}")]
    Connection(String),
}
