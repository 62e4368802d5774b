//! Storage-shaped records and their translation into the canonical types.
//!
//! Rows written by older revisions may lack reaction, comment or tag
//! columns, use camelCase keys, or carry only `apartment` where newer rows
//! carry `discord_name`. Everything is normalized here so the rest of the
//! crate only sees `Post` and `Account`.

use chrono::{DateTime, Utc};
use marketplace_shared::{Comment, Offer, Post, Role, Status, Tag, User};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Canonical resident record, password included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    /// Stored and compared as plain text.
    pub password: String,
    pub display_name: String,
    pub role: Role,
}

impl Account {
    pub fn to_user(&self) -> User {
        User {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A `users` row as either backend stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl UserRow {
    /// Fills whichever of `apartment` / `discord_name` is missing from the
    /// other.
    pub fn normalize(mut self) -> Self {
        let apartment = present(&self.apartment).map(str::to_string);
        let discord = present(&self.discord_name).map(str::to_string);
        match (apartment, discord) {
            (Some(apartment), None) => self.discord_name = Some(apartment),
            (None, Some(discord)) => self.apartment = Some(discord),
            _ => {}
        }
        self
    }

    pub fn into_account(self) -> Account {
        let row = self.normalize();
        let display_name = present(&row.discord_name)
            .or(present(&row.apartment))
            .unwrap_or_default()
            .to_string();
        Account {
            username: row.username,
            password: row.password,
            display_name,
            role: row.role,
        }
    }
}

impl From<&Account> for UserRow {
    fn from(account: &Account) -> Self {
        let display = Some(account.display_name.clone()).filter(|s| !s.is_empty());
        UserRow {
            username: account.username.clone(),
            password: account.password.clone(),
            apartment: display.clone(),
            discord_name: display,
            role: account.role,
        }
    }
}

/// Dedupes reactors (first occurrence wins) so the count can be derived
/// from the set.
pub fn normalize_reactions(by: Vec<String>) -> (u32, Vec<String>) {
    let mut seen = Vec::with_capacity(by.len());
    for username in by {
        if !seen.contains(&username) {
            seen.push(username);
        }
    }
    (seen.len() as u32, seen)
}

/// A `posts` row in the hosted (snake_case) layout. Optional columns are
/// `None` on rows written before they existed.
#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub price: Option<String>,
    pub time: Option<String>,
    pub tag: Option<String>,
    pub status: Option<String>,
    pub posted_by: String,
    pub created_at: DateTime<Utc>,
    pub thumbs_up_by: Option<Vec<String>>,
    pub comments: Option<Vec<Comment>>,
}

impl PostRow {
    pub fn into_post(self) -> Result<Post, StoreError> {
        let offer = match self.kind.as_str() {
            "For Sale" => Offer::ForSale {
                price: self.price.unwrap_or_default(),
            },
            "Service" => Offer::Service {
                time: self.time.unwrap_or_default(),
            },
            other => {
                return Err(StoreError::Corrupt(format!(
                    "post {} has unknown type `{other}`",
                    self.id
                )))
            }
        };
        let tag = match self.tag.as_deref() {
            None | Some("") => Tag::General,
            Some(tag) => tag
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("post {}: {e}", self.id)))?,
        };
        let status = match self.status.as_deref() {
            None | Some("") => Status::Available,
            Some(status) => status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("post {}: {e}", self.id)))?,
        };
        let (thumbs_up, thumbs_up_by) = normalize_reactions(self.thumbs_up_by.unwrap_or_default());

        Ok(Post {
            id: self.id,
            title: self.title,
            description: self.description,
            offer,
            tag,
            status,
            posted_by: self.posted_by,
            created_at: self.created_at,
            thumbs_up,
            thumbs_up_by,
            comments: self.comments.unwrap_or_default(),
        })
    }
}

/// A post in the camelCase layout of the in-memory store's snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPost {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub offer: Offer,
    #[serde(default)]
    pub tag: Option<Tag>,
    #[serde(default)]
    pub status: Option<Status>,
    pub posted_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub thumbs_up: Option<u32>,
    #[serde(default)]
    pub thumbs_up_by: Option<Vec<String>>,
    #[serde(default)]
    pub comments: Option<Vec<LegacyComment>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyComment {
    pub id: u32,
    pub text: String,
    pub posted_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<LegacyComment> for Comment {
    fn from(c: LegacyComment) -> Self {
        Comment {
            id: c.id,
            text: c.text,
            posted_by: c.posted_by,
            created_at: c.created_at,
        }
    }
}

impl From<&Comment> for LegacyComment {
    fn from(c: &Comment) -> Self {
        LegacyComment {
            id: c.id,
            text: c.text.clone(),
            posted_by: c.posted_by.clone(),
            created_at: c.created_at,
        }
    }
}

impl From<LegacyPost> for Post {
    fn from(p: LegacyPost) -> Self {
        let (thumbs_up, thumbs_up_by) = normalize_reactions(p.thumbs_up_by.unwrap_or_default());
        Post {
            id: p.id,
            title: p.title,
            description: p.description,
            offer: p.offer,
            tag: p.tag.unwrap_or_default(),
            status: p.status.unwrap_or_default(),
            posted_by: p.posted_by,
            created_at: p.created_at,
            thumbs_up,
            thumbs_up_by,
            comments: p
                .comments
                .unwrap_or_default()
                .into_iter()
                .map(Comment::from)
                .collect(),
        }
    }
}

impl From<&Post> for LegacyPost {
    fn from(p: &Post) -> Self {
        LegacyPost {
            id: p.id,
            title: p.title.clone(),
            description: p.description.clone(),
            offer: p.offer.clone(),
            tag: Some(p.tag),
            status: Some(p.status),
            posted_by: p.posted_by.clone(),
            created_at: p.created_at,
            thumbs_up: Some(p.thumbs_up),
            thumbs_up_by: Some(p.thumbs_up_by.clone()),
            comments: Some(p.comments.iter().map(LegacyComment::from).collect()),
        }
    }
}
