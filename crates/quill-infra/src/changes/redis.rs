//! Redis change feed.
//!
//! Change events travel as JSON on the channel `<prefix>:<table>`. Any process
//! that writes to the table (a database trigger relay, another Quill client)
//! publishes there; every subscribed controller refetches.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use quill_core::error::FeedError;
use quill_core::ports::{ChangeEvent, ChangeFeed, ChangeHandler, ChangePublisher, Subscription};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Channel prefix; the table name is appended
    pub channel_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            channel_prefix: "quill:changes".to_string(),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            channel_prefix: std::env::var("REDIS_CHANGE_PREFIX")
                .unwrap_or_else(|_| "quill:changes".to_string()),
        }
    }

    pub fn channel(&self, table: &str) -> String {
        format!("{}:{}", self.channel_prefix, table)
    }
}

/// Redis-backed change feed and publisher.
pub struct RedisChangeFeed {
    conn: ConnectionManager,
    client: Client,
    config: RedisConfig,
}

impl RedisChangeFeed {
    pub async fn new(config: RedisConfig) -> Result<Self, FeedError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| FeedError::Connection(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client.clone());
        let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| FeedError::Connection("Connection timed out".to_string()))?
            .map_err(|e| FeedError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis change feed");

        Ok(Self {
            conn,
            client,
            config,
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, FeedError> {
        Self::new(RedisConfig::from_env()).await
    }
}

#[async_trait]
impl ChangePublisher for RedisChangeFeed {
    async fn publish(&self, event: &ChangeEvent) -> Result<(), FeedError> {
        let payload =
            serde_json::to_string(event).map_err(|e| FeedError::PublishError(e.to_string()))?;
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(self.config.channel(&event.table), payload)
            .await
            .map_err(|e| FeedError::PublishError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for RedisChangeFeed {
    async fn subscribe(
        &self,
        table: &str,
        handler: ChangeHandler,
    ) -> Result<Subscription, FeedError> {
        let channel_name = self.config.channel(table);

        // Subscribe before returning so no change between start() and here is missed
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| FeedError::Connection(e.to_string()))?;
        pubsub
            .subscribe(&channel_name)
            .await
            .map_err(|e| FeedError::SubscribeError(e.to_string()))?;

        tracing::debug!(channel = %channel_name, "Subscribed to Redis channel");

        let handle = tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to get message payload");
                        continue;
                    }
                };

                match serde_json::from_str::<ChangeEvent>(&payload) {
                    Ok(event) => handler(event).await,
                    Err(e) => {
                        tracing::warn!(
                            channel = %channel_name,
                            error = %e,
                            "Ignoring malformed change event"
                        );
                    }
                }
            }

            tracing::info!(channel = %channel_name, "Change feed connection closed");
        });

        Ok(Subscription::new(table, move || handle.abort()))
    }
}
