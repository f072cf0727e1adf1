//! Application state - the controller and the adapters behind it.

use std::sync::Arc;

use quill_core::PostSyncController;
use quill_core::domain::Identity;
use quill_core::ports::{ChangeFeed, ChangePublisher, PostStore, SessionProvider};
use quill_infra::{InMemoryChangeFeed, InMemoryPostStore, StaticSession};

use crate::config::{AppConfig, Backend};

type Feed = (Arc<dyn ChangeFeed>, Arc<dyn ChangePublisher>);

/// Shared application state.
pub struct AppState {
    pub controller: PostSyncController,
    pub session: Arc<dyn SessionProvider>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let (feed, publisher) = build_feed().await;
        let session = build_session(config);
        let store = build_store(config, publisher).await?;

        tracing::info!(backend = %config.backend, "Application state initialized");

        Ok(Self {
            controller: PostSyncController::new(store, session.clone(), feed),
            session,
        })
    }

    /// The signed-in user, if any.
    pub async fn viewer(&self) -> Option<Identity> {
        self.session.current_identity().await
    }
}

async fn build_feed() -> Feed {
    if let Some(feed) = redis_feed().await {
        return feed;
    }

    tracing::debug!("Using in-process change feed");
    let feed = Arc::new(InMemoryChangeFeed::default());
    (feed.clone(), feed)
}

#[cfg(feature = "redis")]
async fn redis_feed() -> Option<Feed> {
    std::env::var("REDIS_URL").ok()?;

    match quill_infra::RedisChangeFeed::from_env().await {
        Ok(feed) => {
            let feed = Arc::new(feed);
            Some((feed.clone(), feed))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to Redis. Using in-process change feed.");
            None
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn redis_feed() -> Option<Feed> {
    None
}

fn build_session(config: &AppConfig) -> Arc<dyn SessionProvider> {
    #[cfg(feature = "auth")]
    {
        if let Some(token) = &config.access_token {
            let tokens = Arc::new(quill_infra::JwtTokenService::from_env());
            return Arc::new(quill_infra::TokenSession::new(tokens, token.clone()));
        }
    }

    #[cfg(not(feature = "auth"))]
    {
        if config.access_token.is_some() {
            tracing::warn!("QUILL_ACCESS_TOKEN ignored: built without the auth feature");
        }
    }

    match config.user_id {
        Some(user_id) => Arc::new(StaticSession::signed_in(Identity::new(user_id))),
        None => {
            tracing::info!("No session configured, changes will be refused");
            Arc::new(StaticSession::anonymous())
        }
    }
}

async fn build_store(
    config: &AppConfig,
    publisher: Arc<dyn ChangePublisher>,
) -> anyhow::Result<Arc<dyn PostStore>> {
    match config.backend {
        Backend::Memory => {
            tracing::warn!("Using in-memory post store. Posts are lost on exit.");
            Ok(Arc::new(InMemoryPostStore::new().with_publisher(publisher)))
        }
        Backend::Postgres => postgres_store(publisher).await,
        Backend::Rest => rest_store(config),
    }
}

#[cfg(feature = "postgres")]
async fn postgres_store(publisher: Arc<dyn ChangePublisher>) -> anyhow::Result<Arc<dyn PostStore>> {
    use anyhow::Context;
    use quill_infra::{DatabaseConfig, PostgresPostStore};

    let config =
        DatabaseConfig::from_env().context("DATABASE_URL must be set for the postgres backend")?;
    let db = quill_infra::database::connect(&config).await?;

    Ok(Arc::new(PostgresPostStore::new(db).with_publisher(publisher)))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_store(
    _publisher: Arc<dyn ChangePublisher>,
) -> anyhow::Result<Arc<dyn PostStore>> {
    anyhow::bail!("the postgres backend needs the `postgres` feature")
}

// Change notifications for REST backends come from Redis, the endpoint itself
// announces nothing.
#[cfg(feature = "rest")]
fn rest_store(config: &AppConfig) -> anyhow::Result<Arc<dyn PostStore>> {
    use quill_infra::{RestConfig, RestPostStore};

    let mut store = RestPostStore::new(RestConfig::from_env())?;
    if let Some(token) = &config.access_token {
        store = store.with_access_token(token.clone());
    }
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rest"))]
fn rest_store(_config: &AppConfig) -> anyhow::Result<Arc<dyn PostStore>> {
    anyhow::bail!("the rest backend needs the `rest` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn memory_config(user_id: Option<Uuid>) -> AppConfig {
        AppConfig {
            backend: Backend::Memory,
            access_token: None,
            user_id,
        }
    }

    #[tokio::test]
    async fn test_memory_state_round_trip() {
        let user_id = Uuid::new_v4();
        let state = AppState::new(&memory_config(Some(user_id))).await.unwrap();
        state.controller.start().await.unwrap();

        state
            .controller
            .create("Hello", "World", "Alice")
            .await
            .unwrap();

        let posts = state.controller.posts().await;
        assert_eq!(posts.len(), 1);
        assert!(posts[0].is_owned_by(user_id));
        assert_eq!(state.viewer().await.map(|v| v.user_id), Some(user_id));
    }

    #[tokio::test]
    async fn test_anonymous_state_refuses_changes() {
        let state = AppState::new(&memory_config(None)).await.unwrap();

        let err = state
            .controller
            .create("Hello", "World", "Alice")
            .await
            .unwrap_err();

        assert!(matches!(err, quill_core::SyncError::AuthenticationRequired));
    }
}
