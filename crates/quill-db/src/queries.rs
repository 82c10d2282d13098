use crate::models::{LogRow, PostRow, UserRow, format_timestamp};
use crate::Database;
use anyhow::{Context, Result};
use rusqlite::{Connection, ErrorCode, Row};

use quill_types::models::{LogEntry, LogMethod, Post, User};

/// Outcome of inserting a user; a duplicate username is an expected result,
/// not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInsert {
    Created,
    UsernameTaken,
}

const USER_COLUMNS: &str = "id, username, password, email, phone, created_at";
const POST_COLUMNS: &str = "id, title, body, image_url, created_at";
const LOG_COLUMNS: &str = "id, method, target_post_id, username, old_value, created_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<UserInsert> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, created_at),
            );
            match inserted {
                Ok(_) => Ok(UserInsert::Created),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation
                        && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(UserInsert::UsernameTaken)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Full credential row, including the password hash.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
            conn.query_row(&sql, [username], user_row).optional()
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            conn.query_row(&sql, [id], user_row)
                .optional()?
                .map(UserRow::into_user)
                .transpose()
        })
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(UserRow::into_user).collect()
        })
    }

    /// Sets both contact fields. Returns false if no such user.
    pub fn update_profile(&self, id: &str, email: Option<&str>, phone: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET email = ?2, phone = ?3 WHERE id = ?1",
                (id, email, phone),
            )?;
            Ok(changed > 0)
        })
    }

    // -- Posts --

    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, body, image_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    post.id.to_string(),
                    post.title,
                    post.body,
                    post.image_url,
                    format_timestamp(post.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<Post>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
            conn.query_row(&sql, [id], post_row)
                .optional()?
                .map(PostRow::into_post)
                .transpose()
        })
    }

    /// Newest first. Ties on `created_at` fall back to insertion order.
    pub fn list_posts(&self, limit: u32, offset: u64) -> Result<Vec<Post>> {
        let offset = i64::try_from(offset).context("Page offset out of range")?;
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM posts
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1 OFFSET ?2"
            );
            query_posts(conn, &sql, rusqlite::params![limit, offset])
        })
    }

    pub fn list_all_posts(&self) -> Result<Vec<Post>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, rowid DESC");
            query_posts(conn, &sql, [])
        })
    }

    pub fn count_posts(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))?;
            Ok(count as u64)
        })
    }

    /// Exact equality against title or body. "Fifth" does not match "Fifth Post".
    pub fn search_posts(&self, query: &str) -> Result<Vec<Post>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM posts
                 WHERE title = ?1 OR body = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            query_posts(conn, &sql, [query])
        })
    }

    /// Rewrites title and body only. Returns false if the post is gone.
    pub fn update_post(&self, id: &str, title: &str, body: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET title = ?2, body = ?3 WHERE id = ?1",
                (id, title, body),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Audit log --

    pub fn insert_log(&self, entry: &LogEntry) -> Result<()> {
        let old_value = entry
            .old_value
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO logs (id, method, target_post_id, username, old_value, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    entry.id.to_string(),
                    entry.method.as_str(),
                    entry.target_post_id.to_string(),
                    entry.actor_username,
                    old_value,
                    format_timestamp(entry.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_log(&self, id: &str) -> Result<Option<LogEntry>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {LOG_COLUMNS} FROM logs WHERE id = ?1");
            conn.query_row(&sql, [id], log_row)
                .optional()?
                .map(LogRow::into_entry)
                .transpose()
        })
    }

    pub fn logs_by_user(&self, username: &str, limit: u32) -> Result<Vec<LogEntry>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LOG_COLUMNS} FROM logs
                 WHERE username = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2"
            );
            query_logs(conn, &sql, rusqlite::params![username, limit])
        })
    }

    pub fn logs_by_user_and_method(
        &self,
        method: LogMethod,
        username: &str,
        limit: u32,
    ) -> Result<Vec<LogEntry>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LOG_COLUMNS} FROM logs
                 WHERE method = ?1 AND username = ?2
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3"
            );
            query_logs(conn, &sql, rusqlite::params![method.as_str(), username, limit])
        })
    }
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        image_url: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn log_row(row: &Row<'_>) -> rusqlite::Result<LogRow> {
    Ok(LogRow {
        id: row.get(0)?,
        method: row.get(1)?,
        target_post_id: row.get(2)?,
        username: row.get(3)?,
        old_value: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, post_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(PostRow::into_post).collect()
}

fn query_logs<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<LogEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, log_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(LogRow::into_entry).collect()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
