//! The data-access layer: application intents translated into record-store
//! calls.
//!
//! Operations trust the usernames they are given. `delete_post` performs no
//! authorization at all; callers are expected to check `can_modify_post`
//! first. `update_post_status` is the one mutating operation that checks
//! ownership itself.

use std::sync::Arc;

use chrono::Utc;
use marketplace_shared::{Comment, CreatePost, Post, Role, SignUp, Status};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::listing;
use crate::records::Account;
use crate::store::{NewPost, PostQuery, RecordStore};

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub posted_by: String,
}

#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn RecordStore>,
}

/// `""` and `"all"` mean "do not filter on this column".
fn equality_filter(value: &str) -> Option<String> {
    match value {
        "" | "all" => None,
        other => Some(other.to_string()),
    }
}

fn may_modify(user: &Account, post: &Post) -> bool {
    user.role == Role::Admin || user.username == post.posted_by
}

impl Marketplace {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    // ── Posts ──

    /// Every post, newest first.
    pub fn list_posts(&self) -> Result<Vec<Post>> {
        Ok(self.store.select_posts(&PostQuery::default())?)
    }

    pub fn get_post(&self, id: i64) -> Result<Option<Post>> {
        Ok(self.store.find_post(id)?)
    }

    /// Stores a new listing as given. Length limits and required fields are
    /// the caller's business.
    pub fn create_post(&self, input: CreatePost, posted_by: &str) -> Result<Post> {
        let post = self.store.insert_post(NewPost {
            title: input.title,
            description: input.description,
            offer: input.offer,
            tag: input.tag,
            status: Status::Available,
            posted_by: posted_by.to_string(),
            created_at: Utc::now(),
            thumbs_up_by: Vec::new(),
            comments: Vec::new(),
        })?;
        info!(post_id = post.id, posted_by, "post created");
        Ok(post)
    }

    /// Removes the post. `acting_user` is only recorded; callers check
    /// `can_modify_post` first.
    pub fn delete_post(&self, id: i64, acting_user: &str) -> Result<bool> {
        let removed = self.store.delete_post(id)?;
        if removed {
            info!(post_id = id, acting_user, "post deleted");
        }
        Ok(removed)
    }

    pub fn filter_posts(&self, search: &str, tag: &str, status: &str) -> Result<Vec<Post>> {
        let query = PostQuery {
            tag: equality_filter(tag),
            status: equality_filter(status),
        };
        let mut posts = self.store.select_posts(&query)?;
        posts.retain(|p| listing::matches_search(p, search));
        Ok(posts)
    }

    // ── Interactions ──

    /// Flips the user's thumbs-up. `None` when the post does not exist.
    pub fn toggle_reaction(&self, post_id: i64, username: &str) -> Result<Option<Post>> {
        let updated = self.store.update_post(post_id, &mut |post| {
            listing::toggle_reaction(post, username);
        })?;
        if let Some(post) = &updated {
            debug!(post_id, username, thumbs_up = post.thumbs_up, "reaction toggled");
        }
        Ok(updated)
    }

    pub fn has_reacted(post: &Post, username: &str) -> bool {
        listing::has_reacted(post, username)
    }

    /// Appends a comment. `None` when the post does not exist.
    pub fn add_comment(&self, post_id: i64, comment: NewComment) -> Result<Option<Comment>> {
        let mut added = None;
        let now = Utc::now();
        let mut pending = Some(comment);
        self.store.update_post(post_id, &mut |post| {
            if let Some(c) = pending.take() {
                added = Some(listing::append_comment(post, c.text, c.posted_by, now));
            }
        })?;
        if let Some(c) = &added {
            debug!(post_id, comment_id = c.id, "comment added");
        }
        Ok(added)
    }

    pub fn can_modify_post(&self, username: &str, post_id: i64) -> Result<bool> {
        let Some(user) = self.store.find_user(username)? else {
            return Ok(false);
        };
        let Some(post) = self.store.find_post(post_id)? else {
            return Ok(false);
        };
        Ok(may_modify(&user, &post))
    }

    /// Any status may follow any other; only ownership is checked.
    pub fn update_post_status(&self, post_id: i64, status: Status, acting_user: &str) -> Result<Post> {
        let post = self
            .store
            .find_post(post_id)?
            .ok_or_else(|| AppError::NotFound(format!("post {post_id}")))?;
        let allowed = match self.store.find_user(acting_user)? {
            Some(user) => may_modify(&user, &post),
            None => false,
        };
        if !allowed {
            return Err(AppError::Forbidden(format!(
                "{acting_user} may not change the status of post {post_id}"
            )));
        }

        let updated = self
            .store
            .update_post(post_id, &mut |p| p.status = status)?
            .ok_or_else(|| AppError::NotFound(format!("post {post_id}")))?;
        info!(post_id, status = status.as_str(), acting_user, "status updated");
        Ok(updated)
    }

    // ── Users ──

    pub fn get_user(&self, username: &str) -> Result<Option<Account>> {
        Ok(self.store.find_user(username)?)
    }

    /// Registers a resident with the `user` role. Does not look for an
    /// existing account with the same name.
    pub fn create_user(&self, input: SignUp) -> Result<Account> {
        let account = Account {
            username: input.username,
            password: input.password,
            display_name: input.display_name,
            role: Role::User,
        };
        self.store.insert_user(&account)?;
        info!(username = %account.username, "user created");
        Ok(account)
    }

    /// Plain-text password comparison.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<Account>> {
        Ok(self
            .store
            .find_user(username)?
            .filter(|account| account.password == password))
    }
}
