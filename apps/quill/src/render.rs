//! Terminal rendering of posts, snapshots and notices.

use std::fmt::Write;

use uuid::Uuid;

use quill_core::domain::Post;
use quill_core::{SyncError, SyncPhase, SyncSnapshot};
use quill_shared::{Notice, NoticeLevel, PostCard, format_published, reading_time_minutes};

pub fn card(post: &Post, viewer: Option<Uuid>) -> PostCard {
    PostCard::new(
        post.id,
        &post.title,
        &post.author,
        &post.content,
        post.created_at,
        viewer.is_some_and(|user_id| post.is_owned_by(user_id)),
    )
}

/// One block per post, newest first.
pub fn render_list(posts: &[Post], viewer: Option<Uuid>) -> String {
    if posts.is_empty() {
        return "No posts yet.\n".to_string();
    }

    let mut out = String::new();
    for post in posts {
        let card = card(post, viewer);
        let marker = if card.editable { " [yours]" } else { "" };
        let _ = writeln!(out, "{}{}", card.title, marker);
        let _ = writeln!(
            out,
            "  by {} | {} | {} min read | {}",
            card.author, card.published, card.reading_minutes, card.id
        );
        let _ = writeln!(out, "  {}", card.excerpt);
        out.push('\n');
    }
    out
}

pub fn render_post(post: &Post, viewer: Option<Uuid>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", post.title);
    let _ = writeln!(
        out,
        "by {} | {} | {} min read",
        post.author,
        format_published(post.created_at),
        reading_time_minutes(&post.content)
    );
    if post.updated_at != post.created_at {
        let _ = writeln!(out, "updated {}", format_published(post.updated_at));
    }
    if viewer.is_some_and(|user_id| post.is_owned_by(user_id)) {
        let _ = writeln!(out, "(you can edit this post)");
    }
    out.push('\n');
    let _ = writeln!(out, "{}", post.content);
    out
}

/// Header line for one `watch` update.
pub fn render_status(snapshot: &SyncSnapshot) -> String {
    let state = match (snapshot.phase, snapshot.loading) {
        (SyncPhase::Ready, _) => "ready",
        (_, true) => "loading",
        _ => "unavailable",
    };
    let count = snapshot.posts.len();
    match &snapshot.error {
        Some(error) => format!("-- {count} posts ({state}, last refresh failed: {error}) --"),
        None => format!("-- {count} posts ({state}) --"),
    }
}

pub fn notice_for(err: &SyncError) -> Notice {
    match err {
        SyncError::Validation(detail) => Notice::invalid_input(detail.clone()),
        SyncError::AuthenticationRequired => Notice::sign_in_required(),
        SyncError::NotOwner(_) => Notice::not_owner(),
        SyncError::PostNotFound(id) => {
            Notice::error("Post not found").with_detail(format!("No post with id {id}."))
        }
        SyncError::RemoteOperationFailed(detail) => {
            Notice::error("The change could not be saved").with_detail(detail.clone())
        }
        SyncError::FetchFailed(detail) => {
            Notice::error("Posts could not be loaded").with_detail(detail.clone())
        }
        SyncError::SubscriptionFailed(detail) => {
            Notice::error("Live updates are unavailable").with_detail(detail.clone())
        }
    }
}

pub fn render_notice(notice: &Notice) -> String {
    let prefix = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
    };
    format!("{prefix}: {notice}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(owner: Option<Uuid>, content: &str) -> Post {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 15, 4, 0).unwrap();
        Post {
            id: Uuid::new_v4(),
            title: "Hi".to_string(),
            content: content.to_string(),
            author: "Alice".to_string(),
            user_id: owner,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_list_marks_own_posts() {
        let me = Uuid::new_v4();
        let posts = vec![post(Some(me), "World"), post(None, "Legacy")];

        let out = render_list(&posts, Some(me));

        assert_eq!(out.matches("[yours]").count(), 1);
        assert!(out.contains("by Alice | January 2, 2025, 03:04 PM | 1 min read"));
    }

    #[test]
    fn test_list_truncates_content() {
        let out = render_list(&[post(None, &"x".repeat(400))], None);
        assert!(out.contains(&format!("  {}...", "x".repeat(150))));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(render_list(&[], None), "No posts yet.\n");
    }

    #[test]
    fn test_status_reports_stale_snapshot() {
        let snapshot = SyncSnapshot {
            posts: vec![post(None, "World")],
            loading: false,
            error: Some("Failed to fetch posts: timeout".to_string()),
            phase: SyncPhase::Ready,
        };

        let status = render_status(&snapshot);

        assert!(status.starts_with("-- 1 posts (ready"));
        assert!(status.contains("timeout"));
    }

    #[test]
    fn test_notices() {
        let id = Uuid::new_v4();
        assert_eq!(
            render_notice(&notice_for(&SyncError::NotOwner(id))),
            "error: Not allowed: You can only change posts you created."
        );
        assert!(
            notice_for(&SyncError::RemoteOperationFailed("RLS".into()))
                .to_string()
                .ends_with("RLS")
        );
        assert_eq!(
            render_notice(&Notice::success("Post deleted")),
            "ok: Post deleted"
        );
    }
}
