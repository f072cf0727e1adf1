//! Post synchronization controller.
//!
//! Keeps an in-memory snapshot of every post in step with the remote store.
//! The snapshot is always replaced wholesale: after each mutation made through
//! the controller, and after each change notification from the feed, the full
//! collection is fetched again.

mod state;


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, RwLock, broadcast};
use uuid::Uuid;

use crate::domain::{Identity, Post, PostDraft, PostPatch};
use crate::error::SyncError;
use crate::ports::{
    ChangeEvent, ChangeFeed, ChangeHandler, OrderBy, POSTS_TABLE, PostStore, RowFilter,
    SessionProvider, Subscription,
};

pub use state::{SyncPhase, SyncSnapshot};

/// Snapshots retained for slow `subscribe_updates` receivers.
const UPDATE_BUFFER: usize = 16;

/// Owns the post snapshot and mediates every mutation.
pub struct PostSyncController {
    shared: Arc<Shared>,
    subscription: Mutex<Option<Subscription>>,
}

/// State reachable from change handlers.
struct Shared {
    store: Arc<dyn PostStore>,
    session: Arc<dyn SessionProvider>,
    feed: Arc<dyn ChangeFeed>,
    state: RwLock<SyncSnapshot>,
    updates: broadcast::Sender<SyncSnapshot>,
    active: AtomicBool,
}

impl Shared {
    async fn refresh(&self) {
        let result = self.store.select_all(OrderBy::newest_first()).await;

        let snapshot = {
            let mut state = self.state.write().await;
            match result {
                Ok(posts) => {
                    tracing::debug!(count = posts.len(), "Post snapshot replaced");
                    state.posts = posts;
                    state.error = None;
                    state.phase = SyncPhase::Ready;
                }
                Err(e) => {
                    let err = SyncError::FetchFailed(e.message().to_string());
                    tracing::warn!(error = %e, "Failed to refresh posts, keeping previous snapshot");
                    state.error = Some(err.to_string());
                }
            }
            state.loading = false;
            state.clone()
        };

        // No receivers is fine
        let _ = self.updates.send(snapshot);
    }

    async fn on_change(&self, event: ChangeEvent) {
        if !self.active.load(Ordering::SeqCst) {
            tracing::debug!(table = %event.table, "Ignoring change after stop");
            return;
        }
        tracing::debug!(
            table = %event.table,
            kind = %event.kind,
            row_id = ?event.row_id,
            "Change notification received"
        );
        self.refresh().await;
    }
}

impl PostSyncController {
    pub fn new(
        store: Arc<dyn PostStore>,
        session: Arc<dyn SessionProvider>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            shared: Arc::new(Shared {
                store,
                session,
                feed,
                state: RwLock::new(SyncSnapshot::default()),
                updates,
                active: AtomicBool::new(false),
            }),
            subscription: Mutex::new(None),
        }
    }

    /// Load the initial snapshot and subscribe to `posts` changes.
    ///
    /// Does nothing if already started.
    pub async fn start(&self) -> Result<(), SyncError> {
        let mut slot = self.subscription.lock().await;
        if slot.is_some() {
            tracing::debug!("Post synchronization already running");
            return Ok(());
        }

        {
            let mut state = self.shared.state.write().await;
            if state.phase == SyncPhase::Uninitialized {
                state.phase = SyncPhase::Loading;
                state.loading = true;
            }
        }

        self.shared.active.store(true, Ordering::SeqCst);
        self.shared.refresh().await;

        let shared = Arc::clone(&self.shared);
        let handler: ChangeHandler = Box::new(move |event: ChangeEvent| {
            let shared = Arc::clone(&shared);
            Box::pin(async move { shared.on_change(event).await })
        });

        match self.shared.feed.subscribe(POSTS_TABLE, handler).await {
            Ok(subscription) => {
                tracing::info!(table = POSTS_TABLE, "Post synchronization started");
                *slot = Some(subscription);
                Ok(())
            }
            Err(e) => {
                self.shared.active.store(false, Ordering::SeqCst);
                tracing::error!(error = %e, "Failed to subscribe to post changes");
                Err(SyncError::SubscriptionFailed(e.to_string()))
            }
        }
    }

    /// Release the change subscription. Later notifications are ignored.
    pub async fn stop(&self) {
        let mut slot = self.subscription.lock().await;
        // `active` only changes while the subscription lock is held
        self.shared.active.store(false, Ordering::SeqCst);
        if let Some(subscription) = slot.take() {
            subscription.close();
            tracing::info!(table = POSTS_TABLE, "Post synchronization stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.subscription.lock().await.is_some()
    }

    /// Replace the snapshot with the store's current contents.
    ///
    /// Failures are recorded in the snapshot's `error` rather than returned.
    pub async fn refresh(&self) {
        self.shared.refresh().await;
    }

    /// Create a post owned by the signed-in identity.
    pub async fn create(&self, title: &str, content: &str, author: &str) -> Result<(), SyncError> {
        let draft = PostDraft::new(title, content, author)?;
        let identity = self.require_identity().await?;

        self.shared
            .store
            .insert(draft.owned_by(identity.user_id))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Post insert rejected");
                SyncError::from(e)
            })?;

        tracing::info!(user_id = %identity.user_id, "Post created");
        self.shared.refresh().await;
        Ok(())
    }

    /// Change the title and content of a post owned by the signed-in identity.
    pub async fn update(&self, id: Uuid, title: &str, content: &str) -> Result<(), SyncError> {
        let patch = PostPatch::new(title, content)?;
        let identity = self.require_identity().await?;
        self.ensure_owner(id, &identity).await?;

        let filter = RowFilter::id(id).owned_by(identity.user_id);
        let affected = self.shared.store.update(patch, filter).await.map_err(|e| {
            tracing::warn!(post_id = %id, error = %e, "Post update rejected");
            SyncError::from(e)
        })?;

        self.shared.refresh().await;
        Self::expect_row(id, affected)?;
        tracing::info!(post_id = %id, "Post updated");
        Ok(())
    }

    /// Permanently delete a post owned by the signed-in identity.
    pub async fn delete(&self, id: Uuid) -> Result<(), SyncError> {
        let identity = self.require_identity().await?;
        self.ensure_owner(id, &identity).await?;

        let filter = RowFilter::id(id).owned_by(identity.user_id);
        let affected = self.shared.store.delete(filter).await.map_err(|e| {
            tracing::warn!(post_id = %id, error = %e, "Post delete rejected");
            SyncError::from(e)
        })?;

        self.shared.refresh().await;
        Self::expect_row(id, affected)?;
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    pub async fn snapshot(&self) -> SyncSnapshot {
        self.shared.state.read().await.clone()
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.shared.state.read().await.posts.clone()
    }

    pub async fn loading(&self) -> bool {
        self.shared.state.read().await.loading
    }

    pub async fn last_error(&self) -> Option<String> {
        self.shared.state.read().await.error.clone()
    }

    pub async fn phase(&self) -> SyncPhase {
        self.shared.state.read().await.phase
    }

    /// Receive every snapshot produced by a refresh.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<SyncSnapshot> {
        self.shared.updates.subscribe()
    }

    async fn require_identity(&self) -> Result<Identity, SyncError> {
        self.shared
            .session
            .current_identity()
            .await
            .ok_or(SyncError::AuthenticationRequired)
    }

    async fn ensure_owner(&self, id: Uuid, identity: &Identity) -> Result<(), SyncError> {
        let post = self
            .shared
            .store
            .select_one(id)
            .await?
            .ok_or(SyncError::PostNotFound(id))?;

        if !post.is_owned_by(identity.user_id) {
            tracing::warn!(
                post_id = %id,
                user_id = %identity.user_id,
                owner = ?post.user_id,
                "Refusing to modify post owned by someone else"
            );
            return Err(SyncError::NotOwner(id));
        }
        Ok(())
    }

    /// The guard matched nothing: the row vanished or changed owner after the check.
    fn expect_row(id: Uuid, affected: u64) -> Result<(), SyncError> {
        if affected == 0 {
            tracing::warn!(post_id = %id, "Guarded mutation matched no rows");
            return Err(SyncError::RemoteOperationFailed(format!(
                "no post matched id {id} for the current owner"
            )));
        }
        Ok(())
    }
}
