//! Session providers.

use async_trait::async_trait;
use tokio::sync::RwLock;

use quill_core::domain::Identity;
use quill_core::ports::SessionProvider;

/// A session whose identity is set by the host application.
#[derive(Debug, Default)]
pub struct StaticSession {
    identity: RwLock<Option<Identity>>,
}

impl StaticSession {
    /// A session nobody is signed in to.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: RwLock::new(Some(identity)),
        }
    }

    pub async fn sign_in(&self, identity: Identity) {
        tracing::debug!(user_id = %identity.user_id, "Signed in");
        *self.identity.write().await = Some(identity);
    }

    pub async fn sign_out(&self) {
        *self.identity.write().await = None;
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_identity(&self) -> Option<Identity> {
        self.identity.read().await.clone()
    }
}

#[cfg(feature = "auth")]
pub use token::TokenSession;

#[cfg(feature = "auth")]
mod token {
    use std::sync::Arc;

    use async_trait::async_trait;

    use quill_core::domain::Identity;
    use quill_core::ports::{AuthError, SessionProvider, TokenService};

    /// Session backed by an access token, re-validated on every lookup so an
    /// expired token reads as signed out.
    pub struct TokenSession {
        tokens: Arc<dyn TokenService>,
        access_token: String,
    }

    impl TokenSession {
        pub fn new(tokens: Arc<dyn TokenService>, access_token: impl Into<String>) -> Self {
            Self {
                tokens,
                access_token: access_token.into(),
            }
        }

        pub fn access_token(&self) -> &str {
            &self.access_token
        }
    }

    #[async_trait]
    impl SessionProvider for TokenSession {
        async fn current_identity(&self) -> Option<Identity> {
            match self.tokens.validate_token(&self.access_token) {
                Ok(claims) => Some(claims.into()),
                Err(AuthError::TokenExpired) => {
                    tracing::info!("Access token expired, treating session as signed out");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected access token");
                    None
                }
            }
        }
    }
}
