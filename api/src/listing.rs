//! Pure operations on a single post.

use chrono::{DateTime, Utc};
use marketplace_shared::{Comment, Post};

pub fn has_reacted(post: &Post, username: &str) -> bool {
    post.thumbs_up_by.iter().any(|u| u == username)
}

/// Adds `username` to the reactors if absent, removes it if present.
/// Returns whether the user is now reacting.
pub fn toggle_reaction(post: &mut Post, username: &str) -> bool {
    let reacted = match post.thumbs_up_by.iter().position(|u| u == username) {
        Some(idx) => {
            post.thumbs_up_by.remove(idx);
            false
        }
        None => {
            post.thumbs_up_by.push(username.to_string());
            true
        }
    };
    post.thumbs_up = post.thumbs_up_by.len() as u32;
    reacted
}

/// Appends a comment numbered after the ones already on the post.
pub fn append_comment(
    post: &mut Post,
    text: String,
    posted_by: String,
    at: DateTime<Utc>,
) -> Comment {
    let comment = Comment {
        id: post.comments.len() as u32 + 1,
        text,
        posted_by,
        created_at: at,
    };
    post.comments.push(comment.clone());
    comment
}

/// Case-insensitive substring match on title or description. An empty term
/// matches everything.
pub fn matches_search(post: &Post, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    post.title.to_lowercase().contains(&needle) || post.description.to_lowercase().contains(&needle)
}
