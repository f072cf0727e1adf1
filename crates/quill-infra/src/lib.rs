//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`:
//! post stores, change feeds and session providers.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL post store via SeaORM
//! - `rest` - PostgREST post store via reqwest
//! - `auth` - JWT validation for token-backed sessions
//! - `redis` - Redis pub/sub change feed

pub mod auth;
pub mod changes;
pub mod store;

#[cfg(feature = "postgres")]
pub mod database;

// Re-exports - In-Memory
pub use auth::StaticSession;
pub use changes::InMemoryChangeFeed;
pub use store::InMemoryPostStore;

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService, TokenSession};

#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, PostgresPostStore};

#[cfg(feature = "rest")]
pub use store::{RestConfig, RestPostStore};

#[cfg(feature = "redis")]
pub use changes::{RedisChangeFeed, RedisConfig};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::broadcast;
    use uuid::Uuid;

    use quill_core::domain::{Identity, PostDraft};
    use quill_core::ports::{POSTS_TABLE, PostStore};
    use quill_core::{PostSyncController, SyncError, SyncSnapshot};

    use super::*;

    struct Client {
        user_id: Uuid,
        controller: PostSyncController,
    }

    fn client(store: &Arc<InMemoryPostStore>, feed: &Arc<InMemoryChangeFeed>) -> Client {
        let user_id = Uuid::new_v4();
        let session = Arc::new(StaticSession::signed_in(Identity::new(user_id)));
        Client {
            user_id,
            controller: PostSyncController::new(store.clone(), session, feed.clone()),
        }
    }

    async fn wait_for(
        rx: &mut broadcast::Receiver<SyncSnapshot>,
        done: impl Fn(&SyncSnapshot) -> bool,
    ) -> SyncSnapshot {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(snapshot) if done(&snapshot) => return snapshot,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("updates closed"),
                }
            }
        })
        .await
        .expect("snapshot never arrived")
    }

    #[tokio::test]
    async fn test_two_clients_share_one_store() {
        let feed = Arc::new(InMemoryChangeFeed::default());
        let store = Arc::new(InMemoryPostStore::new().with_publisher(feed.clone()));
        let alice = client(&store, &feed);
        let bob = client(&store, &feed);
        alice.controller.start().await.unwrap();
        bob.controller.start().await.unwrap();
        let mut bob_updates = bob.controller.subscribe_updates();

        alice
            .controller
            .create("Hello", "First post", "Alice")
            .await
            .unwrap();

        let seen = wait_for(&mut bob_updates, |s| s.posts.len() == 1).await;
        let post = seen.posts[0].clone();
        assert!(post.is_owned_by(alice.user_id));

        let err = bob
            .controller
            .update(post.id, "Hijacked", "Nope")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotOwner(id) if id == post.id));
        let stored = store.select_one(post.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Hello");

        alice.controller.delete(post.id).await.unwrap();
        wait_for(&mut bob_updates, |s| s.posts.is_empty()).await;
        assert!(alice.controller.posts().await.is_empty());
        assert!(store.is_empty().await);

        alice.controller.stop().await;
        bob.controller.stop().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(feed.subscriber_count(POSTS_TABLE).await, 0);
    }

    #[tokio::test]
    async fn test_external_write_reaches_running_controller() {
        let feed = Arc::new(InMemoryChangeFeed::default());
        let store = Arc::new(InMemoryPostStore::new().with_publisher(feed.clone()));
        let reader = client(&store, &feed);
        reader.controller.start().await.unwrap();
        let mut updates = reader.controller.subscribe_updates();

        // Written straight to the store, as another process would
        let row = PostDraft::new("Elsewhere", "Body", "Carol")
            .unwrap()
            .owned_by(Uuid::new_v4());
        store.insert(row).await.unwrap();

        let snapshot = wait_for(&mut updates, |s| !s.posts.is_empty()).await;
        assert_eq!(snapshot.posts[0].title, "Elsewhere");
        assert!(snapshot.error.is_none());
    }
}
