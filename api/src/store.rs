//! The record-store seam: row storage for `users` and `posts` with equality
//! filters and newest-first ordering. Everything above it talks to
//! `dyn RecordStore`.

use chrono::{DateTime, Utc};
use marketplace_shared::{Comment, Offer, Post, Status, Tag};
use thiserror::Error;

use crate::records::Account;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("encoding: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("snapshot i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Equality filters applied by the store. `None` matches everything.
///
/// Values are kept as raw strings so a filter naming an unknown tag or
/// status simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub tag: Option<String>,
    pub status: Option<String>,
}

impl PostQuery {
    pub fn matches(&self, post: &Post) -> bool {
        self.tag.as_deref().map_or(true, |t| post.tag.as_str() == t)
            && self
                .status
                .as_deref()
                .map_or(true, |s| post.status.as_str() == s)
    }
}

/// A post before the store has given it an id.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub offer: Offer,
    pub tag: Tag,
    pub status: Status,
    pub posted_by: String,
    pub created_at: DateTime<Utc>,
    pub thumbs_up_by: Vec<String>,
    pub comments: Vec<Comment>,
}

impl NewPost {
    pub fn into_post(self, id: i64) -> Post {
        Post {
            id,
            title: self.title,
            description: self.description,
            offer: self.offer,
            tag: self.tag,
            status: self.status,
            posted_by: self.posted_by,
            created_at: self.created_at,
            thumbs_up: self.thumbs_up_by.len() as u32,
            thumbs_up_by: self.thumbs_up_by,
            comments: self.comments,
        }
    }
}

pub trait RecordStore: Send + Sync {
    /// Posts matching `query`, newest first (`created_at` desc, then id desc).
    fn select_posts(&self, query: &PostQuery) -> StoreResult<Vec<Post>>;

    fn find_post(&self, id: i64) -> StoreResult<Option<Post>>;

    fn insert_post(&self, post: NewPost) -> StoreResult<Post>;

    /// Returns whether a row was removed.
    fn delete_post(&self, id: i64) -> StoreResult<bool>;

    /// Reads the post, lets `apply` change it and writes it back as one
    /// atomic step. `None` when the post does not exist.
    fn update_post(&self, id: i64, apply: &mut dyn FnMut(&mut Post)) -> StoreResult<Option<Post>>;

    fn find_user(&self, username: &str) -> StoreResult<Option<Account>>;

    fn insert_user(&self, account: &Account) -> StoreResult<()>;

    fn count_posts(&self) -> StoreResult<usize>;
}
