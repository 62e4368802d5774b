use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use marketplace_shared::{Post, Role};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};
use serde::de::DeserializeOwned;

use crate::records::{Account, PostRow, UserRow};
use crate::store::{NewPost, PostQuery, RecordStore, StoreResult};

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

pub fn run_migrations(pool: &DbPool) -> StoreResult<()> {
    let conn = pool.get()?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            username     TEXT PRIMARY KEY,
            password     TEXT NOT NULL,
            apartment    TEXT,
            discord_name TEXT,
            role         TEXT NOT NULL DEFAULT 'user',
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posts (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL,
            type         TEXT NOT NULL,
            price        TEXT,
            time         TEXT,
            tag          TEXT DEFAULT 'general',
            status       TEXT DEFAULT 'Available',
            posted_by    TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            thumbs_up    INTEGER DEFAULT 0,
            thumbs_up_by TEXT DEFAULT '[]',
            comments     TEXT DEFAULT '[]'
        );
        CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at);
        CREATE INDEX IF NOT EXISTS idx_posts_tag_status ON posts(tag, status);
        ",
    )?;

    Ok(())
}

const POST_COLUMNS: &str = "id, title, description, type, price, time, tag, status, \
                            posted_by, created_at, thumbs_up_by, comments";

/// RFC 3339 with microseconds and a `Z` suffix.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(at.with_timezone(&Utc));
    }
    // rows inserted by hand with sqlite's datetime('now')
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| conversion_error(idx, e))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn read_post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        kind: row.get(3)?,
        price: row.get(4)?,
        time: row.get(5)?,
        tag: row.get(6)?,
        status: row.get(7)?,
        posted_by: row.get(8)?,
        created_at: time_column(row, 9)?,
        thumbs_up_by: json_column(row, 10)?,
        comments: json_column(row, 11)?,
    })
}

fn fetch_post(conn: &Connection, id: i64) -> StoreResult<Option<Post>> {
    let row = conn
        .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            [id],
            read_post_row,
        )
        .optional()?;
    row.map(PostRow::into_post).transpose()
}

/// `RecordStore` over a pooled SQLite database using the hosted layout:
/// snake_case columns, reactions and comments as JSON arrays.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> StoreResult<Self> {
        run_migrations(&pool)?;
        Ok(Self { pool })
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|c| c.busy_timeout(Duration::from_secs(5)));
        Self::new(r2d2::Pool::new(manager)?)
    }

    /// A private in-memory database. The pool holds one connection because
    /// every `:memory:` connection is its own database.
    pub fn in_memory() -> StoreResult<Self> {
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())?;
        Self::new(pool)
    }
}

impl RecordStore for SqliteStore {
    fn select_posts(&self, query: &PostQuery) -> StoreResult<Vec<Post>> {
        let conn = self.pool.get()?;

        let mut sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE 1 = 1");
        let mut args: Vec<&str> = Vec::new();
        if let Some(tag) = &query.tag {
            sql.push_str(" AND COALESCE(tag, 'general') = ?");
            args.push(tag);
        }
        if let Some(status) = &query.status {
            sql.push_str(" AND COALESCE(status, 'Available') = ?");
            args.push(status);
        }
        // julianday() reads both RFC 3339 and `datetime('now')` text
        sql.push_str(" ORDER BY julianday(created_at) DESC, created_at DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args), read_post_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(PostRow::into_post).collect()
    }

    fn find_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let conn = self.pool.get()?;
        fetch_post(&conn, id)
    }

    fn insert_post(&self, mut post: NewPost) -> StoreResult<Post> {
        let conn = self.pool.get()?;
        post.created_at = post.created_at.trunc_subsecs(6);

        conn.execute(
            "INSERT INTO posts (title, description, type, price, time, tag, status,
                                posted_by, created_at, thumbs_up, thumbs_up_by, comments)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                post.title,
                post.description,
                post.offer.type_name(),
                post.offer.price(),
                post.offer.time(),
                post.tag.as_str(),
                post.status.as_str(),
                post.posted_by,
                timestamp(&post.created_at),
                post.thumbs_up_by.len() as i64,
                serde_json::to_string(&post.thumbs_up_by)?,
                serde_json::to_string(&post.comments)?,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Ok(post.into_post(id))
    }

    fn delete_post(&self, id: i64) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let affected = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    fn update_post(&self, id: i64, apply: &mut dyn FnMut(&mut Post)) -> StoreResult<Option<Post>> {
        let mut conn = self.pool.get()?;
        // write lock is held from the read until commit
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut post) = fetch_post(&tx, id)? else {
            return Ok(None);
        };
        apply(&mut post);

        tx.execute(
            "UPDATE posts SET title = ?2, description = ?3, type = ?4, price = ?5, time = ?6,
                              tag = ?7, status = ?8, thumbs_up = ?9, thumbs_up_by = ?10,
                              comments = ?11
             WHERE id = ?1",
            rusqlite::params![
                id,
                post.title,
                post.description,
                post.offer.type_name(),
                post.offer.price(),
                post.offer.time(),
                post.tag.as_str(),
                post.status.as_str(),
                post.thumbs_up,
                serde_json::to_string(&post.thumbs_up_by)?,
                serde_json::to_string(&post.comments)?,
            ],
        )?;
        tx.commit()?;

        Ok(Some(post))
    }

    fn find_user(&self, username: &str) -> StoreResult<Option<Account>> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                "SELECT username, password, apartment, discord_name, role
                 FROM users WHERE username = ?1",
                [username],
                |row| {
                    let role: String = row.get(4)?;
                    Ok(UserRow {
                        username: row.get(0)?,
                        password: row.get(1)?,
                        apartment: row.get(2)?,
                        discord_name: row.get(3)?,
                        role: role.parse::<Role>().map_err(|e| conversion_error(4, e))?,
                    })
                },
            )
            .optional()?;
        Ok(row.map(UserRow::into_account))
    }

    fn insert_user(&self, account: &Account) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let row = UserRow::from(account);
        conn.execute(
            "INSERT INTO users (username, password, apartment, discord_name, role)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                row.username,
                row.password,
                row.apartment,
                row.discord_name,
                row.role.as_str(),
            ],
        )?;
        Ok(())
    }

    fn count_posts(&self) -> StoreResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
