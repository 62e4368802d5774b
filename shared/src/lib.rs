use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod session;

pub use session::Session;

/// Raised when a string does not name a known tag, status or role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} `{}`", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

// ── Auth ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Public view of a resident. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUp {
    pub username: String,
    pub password: String,
    /// Discord handle, or the apartment number for residents who registered
    /// before handles were collected.
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// ── Listings ──

/// What a listing offers. `price` only exists on sales and `time` only on
/// services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Offer {
    #[serde(rename = "For Sale")]
    ForSale { price: String },
    #[serde(rename = "Service")]
    Service { time: String },
}

impl Offer {
    pub fn type_name(&self) -> &'static str {
        match self {
            Offer::ForSale { .. } => "For Sale",
            Offer::Service { .. } => "Service",
        }
    }

    pub fn price(&self) -> Option<&str> {
        match self {
            Offer::ForSale { price } => Some(price),
            Offer::Service { .. } => None,
        }
    }

    pub fn time(&self) -> Option<&str> {
        match self {
            Offer::ForSale { .. } => None,
            Offer::Service { time } => Some(time),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Goods,
    Services,
    Education,
    Money,
    #[default]
    General,
}

impl Tag {
    pub const ALL: [Tag; 5] = [
        Tag::Goods,
        Tag::Services,
        Tag::Education,
        Tag::Money,
        Tag::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Goods => "goods",
            Tag::Services => "services",
            Tag::Education => "education",
            Tag::Money => "money",
            Tag::General => "general",
        }
    }
}

impl FromStr for Tag {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "tag",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Available,
    Pending,
    Completed,
    Sold,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Available,
        Status::Pending,
        Status::Completed,
        Status::Sold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Available => "Available",
            Status::Pending => "Pending",
            Status::Completed => "Completed",
            Status::Sold => "Sold",
        }
    }
}

impl FromStr for Status {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u32,
    pub text: String,
    pub posted_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub offer: Offer,
    pub tag: Tag,
    pub status: Status,
    pub posted_by: String,
    pub created_at: DateTime<Utc>,
    pub thumbs_up: u32,
    pub thumbs_up_by: Vec<String>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub offer: Offer,
    #[serde(default)]
    pub tag: Tag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub status: Status,
}

// ── Reactions ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub thumbs_up: u32,
    pub reacted: bool,
}

// ── Catalog ──

/// The choices a client offers in its tag and status pickers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub tags: Vec<Tag>,
    pub statuses: Vec<Status>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            tags: Tag::ALL.to_vec(),
            statuses: Status::ALL.to_vec(),
        }
    }
}
