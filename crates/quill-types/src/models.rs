use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of an account. The password hash never leaves quill-db.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A blog post. `image_url` and `created_at` are fixed at creation;
/// only `title` and `body` change on edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Kind of content mutation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogMethod {
    Create,
    Update,
    Delete,
}

impl LogMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogMethod::Create => "CREATE",
            LogMethod::Update => "UPDATE",
            LogMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for LogMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLogMethod(pub String);

impl fmt::Display for UnknownLogMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log method '{}'", self.0)
    }
}

impl std::error::Error for UnknownLogMethod {}

impl FromStr for LogMethod {
    type Err = UnknownLogMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(LogMethod::Create),
            "UPDATE" => Ok(LogMethod::Update),
            "DELETE" => Ok(LogMethod::Delete),
            other => Err(UnknownLogMethod(other.to_string())),
        }
    }
}

/// Append-only audit record of one post mutation.
///
/// References the post and actor by copied id / username rather than a live
/// relation, so entries outlive the records they describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub method: LogMethod,
    pub target_post_id: Uuid,
    pub actor_username: String,
    /// Snapshot taken before the write. Absent for CREATE.
    pub old_value: Option<Post>,
    pub created_at: DateTime<Utc>,
}
