//! Change feed port - table change notifications pushed by the backend.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FeedError;

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A row in a watched table was inserted, updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    #[serde(default)]
    pub row_id: Option<Uuid>,
}

impl ChangeEvent {
    pub fn new(table: impl Into<String>, kind: ChangeKind, row_id: Option<Uuid>) -> Self {
        Self {
            table: table.into(),
            kind,
            row_id,
        }
    }
}

/// Handler invoked for every change on a subscribed table.
pub type ChangeHandler =
    Box<dyn Fn(ChangeEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A standing subscription. Released on [`Subscription::close`] or on drop.
pub struct Subscription {
    table: String,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(table: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            table: table.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_open(&self) -> bool {
        self.release.is_some()
    }

    /// Stop receiving notifications.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(table = %self.table, "Change subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("table", &self.table)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Change feed trait - abstraction over realtime backends.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Call `handler` for every change to `table` until the subscription is released.
    async fn subscribe(
        &self,
        table: &str,
        handler: ChangeHandler,
    ) -> Result<Subscription, FeedError>;
}

/// Announces changes on behalf of stores that are not realtime-capable themselves.
#[async_trait]
pub trait ChangePublisher: Send + Sync {
    async fn publish(&self, event: &ChangeEvent) -> Result<(), FeedError>;
}
