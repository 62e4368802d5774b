//! In-process record store. Optionally mirrors itself to a JSON snapshot
//! file in the camelCase layout the browser-side store used.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use marketplace_shared::Post;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::records::{Account, LegacyPost, UserRow};
use crate::store::{NewPost, PostQuery, RecordStore, StoreError, StoreResult};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    posts: Vec<LegacyPost>,
    #[serde(default)]
    users: Vec<UserRow>,
}

#[derive(Debug, Default, Clone)]
struct Tables {
    posts: Vec<Post>,
    users: Vec<Account>,
    next_post_id: i64,
}

impl Tables {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let posts: Vec<Post> = snapshot.posts.into_iter().map(Post::from).collect();
        let users = snapshot
            .users
            .into_iter()
            .map(UserRow::into_account)
            .collect();
        let next_post_id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        Tables {
            posts,
            users,
            next_post_id,
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            posts: self.posts.iter().map(LegacyPost::from).collect(),
            users: self.users.iter().map(UserRow::from).collect(),
        }
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    snapshot: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                next_post_id: 1,
                ..Tables::default()
            }),
            snapshot: None,
        }
    }

    /// Opens a store backed by `path`, loading it if the file exists. Every
    /// mutation rewrites the file.
    pub fn with_snapshot(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let tables = Tables::from_snapshot(serde_json::from_str(&raw)?);
            debug!(
                path = %path.display(),
                posts = tables.posts.len(),
                users = tables.users.len(),
                "loaded snapshot"
            );
            tables
        } else {
            Tables {
                next_post_id: 1,
                ..Tables::default()
            }
        };

        Ok(Self {
            tables: Mutex::new(tables),
            snapshot: Some(path),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Writes the snapshot through a sibling temp file so a crash mid-write
    /// leaves the previous snapshot intact.
    fn persist(&self, tables: &Tables) -> StoreResult<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&tables.to_snapshot())?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Replaces the live tables with `next` once it has been persisted. On a
    /// failed write the live tables are left as they were.
    fn commit(&self, live: &mut Tables, next: Tables) -> StoreResult<()> {
        self.persist(&next)?;
        *live = next;
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn select_posts(&self, query: &PostQuery) -> StoreResult<Vec<Post>> {
        let tables = self.lock()?;
        let mut posts: Vec<Post> = tables
            .posts
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    fn find_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let tables = self.lock()?;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut tables = self.lock()?;
        let mut next = tables.clone();
        let post = post.into_post(next.next_post_id);
        next.next_post_id += 1;
        next.posts.push(post.clone());
        self.commit(&mut tables, next)?;
        Ok(post)
    }

    fn delete_post(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        if !tables.posts.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        let mut next = tables.clone();
        next.posts.retain(|p| p.id != id);
        self.commit(&mut tables, next)?;
        Ok(true)
    }

    fn update_post(&self, id: i64, apply: &mut dyn FnMut(&mut Post)) -> StoreResult<Option<Post>> {
        let mut tables = self.lock()?;
        let Some(index) = tables.posts.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let mut next = tables.clone();
        apply(&mut next.posts[index]);
        let updated = next.posts[index].clone();
        self.commit(&mut tables, next)?;
        Ok(Some(updated))
    }

    fn find_user(&self, username: &str) -> StoreResult<Option<Account>> {
        let tables = self.lock()?;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    fn insert_user(&self, account: &Account) -> StoreResult<()> {
        let mut tables = self.lock()?;
        let mut next = tables.clone();
        next.users.push(account.clone());
        self.commit(&mut tables, next)
    }

    fn count_posts(&self) -> StoreResult<usize> {
        Ok(self.lock()?.posts.len())
    }
}
