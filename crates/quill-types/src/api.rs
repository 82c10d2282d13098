use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LogEntry, LogMethod, Post, User};

// -- Session --

/// Session token claims. Carries only the user identity; no `exp`, so a
/// token stays valid for as long as the signing secret does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
}

/// Payload for the form-view GETs (login, register, add-post).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FormView {
    pub message: Option<String>,
}

// -- Public read path --

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub current_page: u32,
    pub next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    #[serde(rename = "searchInput")]
    pub search_input: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub posts: Vec<Post>,
}

// -- Admin --

#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
    pub username: String,
    pub posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
pub struct EditPostForm {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Profile {
    pub user: User,
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct LogFilterForm {
    pub method: LogMethod,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLogs {
    pub username: String,
    pub logs: Vec<LogEntry>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
