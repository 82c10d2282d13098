//! Database row types — these map directly to SQLite rows.
//! Distinct from quill-types models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use quill_types::models::{LogEntry, LogMethod, Post, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

impl UserRow {
    /// Drops the password hash.
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            username: self.username,
            email: self.email,
            phone: self.phone,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub body: String,
    pub image_url: String,
    pub created_at: String,
}

impl PostRow {
    pub fn into_post(self) -> Result<Post> {
        Ok(Post {
            id: parse_id(&self.id)?,
            title: self.title,
            body: self.body,
            image_url: self.image_url,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct LogRow {
    pub id: String,
    pub method: String,
    pub target_post_id: String,
    pub username: String,
    pub old_value: Option<String>,
    pub created_at: String,
}

impl LogRow {
    pub fn into_entry(self) -> Result<LogEntry> {
        let method: LogMethod = self.method.parse()?;
        let old_value = self
            .old_value
            .as_deref()
            .map(serde_json::from_str::<Post>)
            .transpose()
            .with_context(|| format!("Corrupt old_value on log '{}'", self.id))?;

        Ok(LogEntry {
            id: parse_id(&self.id)?,
            method,
            target_post_id: parse_id(&self.target_post_id)?,
            actor_username: self.username,
            old_value,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// RFC 3339 with fixed microsecond precision, so that string order in SQLite
/// matches chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt id '{}'", raw))
}
