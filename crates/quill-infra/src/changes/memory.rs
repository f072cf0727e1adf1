//! In-memory change feed.
//!
//! Delivers change events published within this process. Pair it with a store
//! that announces its own writes (see `InMemoryPostStore::with_publisher`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use quill_core::error::FeedError;
use quill_core::ports::{ChangeEvent, ChangeFeed, ChangeHandler, ChangePublisher, Subscription};

/// In-memory change feed, one broadcast channel per table.
pub struct InMemoryChangeFeed {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<ChangeEvent>>>>,
    buffer_size: usize,
}

impl InMemoryChangeFeed {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            buffer_size,
        }
    }

    /// Number of live subscriptions on `table`.
    pub async fn subscriber_count(&self, table: &str) -> usize {
        self.channels
            .read()
            .await
            .get(table)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for InMemoryChangeFeed {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl ChangePublisher for InMemoryChangeFeed {
    async fn publish(&self, event: &ChangeEvent) -> Result<(), FeedError> {
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(&event.table) {
            // Ignore send errors (no subscribers)
            let _ = sender.send(event.clone());
            tracing::debug!(table = %event.table, kind = %event.kind, "Change published");
        } else {
            tracing::debug!(table = %event.table, "No subscribers for table");
        }

        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for InMemoryChangeFeed {
    async fn subscribe(
        &self,
        table: &str,
        handler: ChangeHandler,
    ) -> Result<Subscription, FeedError> {
        let mut channels = self.channels.write().await;

        let sender = channels
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0);

        let mut receiver = sender.subscribe();
        let table_name = table.to_string();

        let handle = tokio::spawn(async move {
            tracing::info!(table = %table_name, "Subscribed to table changes");

            loop {
                match receiver.recv().await {
                    Ok(event) => handler(event).await,
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        // Skipped events collapse into one, every handler call refetches anyway
                        tracing::warn!(
                            table = %table_name,
                            lagged = count,
                            "Subscriber lagged behind"
                        );
                        let event = ChangeEvent::new(
                            table_name.clone(),
                            quill_core::ports::ChangeKind::Update,
                            None,
                        );
                        handler(event).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!(table = %table_name, "Change channel closed");
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(table, move || handle.abort()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    use quill_core::ports::ChangeKind;

    fn forwarding_handler(tx: mpsc::Sender<ChangeEvent>) -> ChangeHandler {
        Box::new(move |event| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(event).await;
            })
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let feed = InMemoryChangeFeed::default();
        let (tx, mut rx) = mpsc::channel(4);

        let _subscription = feed.subscribe("posts", forwarding_handler(tx)).await.unwrap();
        let event = ChangeEvent::new("posts", ChangeKind::Insert, None);
        feed.publish(&event).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(event));
    }

    #[tokio::test]
    async fn test_other_tables_are_not_delivered() {
        let feed = InMemoryChangeFeed::default();
        let (tx, mut rx) = mpsc::channel(4);

        let _subscription = feed.subscribe("posts", forwarding_handler(tx)).await.unwrap();
        feed.publish(&ChangeEvent::new("comments", ChangeKind::Insert, None))
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(received.is_err());
    }

    #[tokio::test]
    async fn test_closed_subscription_stops_delivery() {
        let feed = InMemoryChangeFeed::default();
        let (tx, mut rx) = mpsc::channel(4);

        let subscription = feed.subscribe("posts", forwarding_handler(tx)).await.unwrap();
        assert_eq!(feed.subscriber_count("posts").await, 1);
        subscription.close();

        // Abort completes asynchronously; give the runtime a turn
        tokio::time::sleep(Duration::from_millis(20)).await;
        feed.publish(&ChangeEvent::new("posts", ChangeKind::Delete, None))
            .await
            .unwrap();

        // The aborted task dropped the handler, and with it the only sender
        let received = tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, None);
    }
}
