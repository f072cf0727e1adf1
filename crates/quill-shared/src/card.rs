//! Post cards - the summary shown for each post in a listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Characters of content shown on a card.
pub const EXCERPT_LENGTH: usize = 150;

const WORDS_PER_MINUTE: usize = 200;

/// Display-ready summary of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCard {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub published: String,
    pub reading_minutes: usize,
    pub excerpt: String,
    /// Whether the viewer may edit or delete the post.
    pub editable: bool,
}

impl PostCard {
    pub fn new(
        id: Uuid,
        title: &str,
        author: &str,
        content: &str,
        created_at: DateTime<Utc>,
        editable: bool,
    ) -> Self {
        Self {
            id,
            title: title.to_string(),
            author: author.to_string(),
            published: format_published(created_at),
            reading_minutes: reading_time_minutes(content),
            excerpt: excerpt(content, EXCERPT_LENGTH),
            editable,
        }
    }
}

/// First `max_chars` characters of `content`, with `...` appended when cut.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}

/// Estimated reading time at 200 words per minute, never less than one.
pub fn reading_time_minutes(content: &str) -> usize {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// e.g. `March 7, 2025, 02:30 PM`
pub fn format_published(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y, %I:%M %p").to_string()
}
