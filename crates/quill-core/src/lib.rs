//! # Quill Core
//!
//! The domain layer of Quill.
//! This crate holds the post model, the ports a backend has to implement, and
//! the controller that keeps a local snapshot of posts in step with the
//! remote store. It has no infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod sync;

pub use error::SyncError;
pub use sync::{PostSyncController, SyncPhase, SyncSnapshot};
