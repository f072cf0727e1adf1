//! # Quill Shared
//!
//! Presentation types shared between consumers of the post controller.
//! Nothing here depends on the backend, so the crate builds for any target.

pub mod card;
pub mod notice;

pub use card::{PostCard, excerpt, format_published, reading_time_minutes};
pub use notice::{Notice, NoticeLevel};
