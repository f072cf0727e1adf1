//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod changes;
mod store;

pub use auth::{AuthError, SessionProvider, TokenClaims, TokenService};
pub use changes::{
    ChangeEvent, ChangeFeed, ChangeHandler, ChangeKind, ChangePublisher, Subscription,
};
pub use store::{ORDER_COLUMN, OrderBy, POSTS_TABLE, PostStore, RowFilter};
