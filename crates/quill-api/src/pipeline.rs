//! Audited post mutations.
//!
//! Create, update and delete share one shape: resolve the actor, read the
//! prior state, apply the write, then append exactly one [`LogEntry`]. The
//! log append only happens after the write committed. The two writes are not
//! wrapped in a transaction; a crash between them leaves an unaudited change,
//! and a concurrent edit/delete on the same post is last-write-wins.

use chrono::{DateTime, SubsecRound, Utc};
use tracing::info;
use uuid::Uuid;

use quill_types::models::{LogEntry, LogMethod, Post};

use crate::assets::ImageUpload;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::{AppState, run_db};

pub struct PostDraft {
    pub title: String,
    pub body: String,
    pub image: ImageUpload,
}

pub struct PostEdit {
    pub title: String,
    pub body: String,
}

pub async fn create_post(state: &AppState, actor: AuthUser, draft: PostDraft) -> ApiResult<Post> {
    let kind = draft.image.kind().ok_or(ApiError::UnsupportedMediaType)?;
    let username = actor_username(state, actor).await?;

    // An orphaned file is left behind if the insert below fails.
    let image_url = state
        .assets
        .store_image(kind, draft.image.file_name.as_deref(), &draft.image.bytes)
        .await?;

    let post = Post {
        id: Uuid::new_v4(),
        title: draft.title,
        body: draft.body,
        image_url,
        created_at: now(),
    };

    let row = post.clone();
    run_db(state, move |db| db.insert_post(&row)).await?;

    append_log(state, LogMethod::Create, post.id, username, None).await?;
    info!("Post {} created by {}", post.id, actor.id);
    Ok(post)
}

/// Returns the post as stored after the edit.
pub async fn update_post(
    state: &AppState,
    actor: AuthUser,
    post_id: Uuid,
    edit: PostEdit,
) -> ApiResult<Post> {
    let username = actor_username(state, actor).await?;
    let prior = load_post(state, post_id).await?;

    let (title, body) = (edit.title.clone(), edit.body.clone());
    let updated = run_db(state, move |db| db.update_post(&post_id.to_string(), &title, &body)).await?;
    if !updated {
        // Deleted between the snapshot and the write.
        return Err(ApiError::NotFound("post"));
    }

    let post = Post {
        title: edit.title,
        body: edit.body,
        ..prior.clone()
    };

    append_log(state, LogMethod::Update, post_id, username, Some(prior)).await?;
    info!("Post {} updated by {}", post_id, actor.id);
    Ok(post)
}

/// Returns the snapshot of the removed post.
pub async fn delete_post(state: &AppState, actor: AuthUser, post_id: Uuid) -> ApiResult<Post> {
    let username = actor_username(state, actor).await?;
    let prior = load_post(state, post_id).await?;

    let deleted = run_db(state, move |db| db.delete_post(&post_id.to_string())).await?;
    if !deleted {
        return Err(ApiError::NotFound("post"));
    }

    append_log(state, LogMethod::Delete, post_id, username, Some(prior.clone())).await?;
    info!("Post {} deleted by {}", post_id, actor.id);
    Ok(prior)
}

/// Current time at the precision the database keeps, so returned records
/// compare equal to what a later read yields.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

async fn actor_username(state: &AppState, actor: AuthUser) -> ApiResult<String> {
    let id = actor.id.to_string();
    run_db(state, move |db| db.get_user(&id))
        .await?
        .map(|user| user.username)
        .ok_or(ApiError::NotFound("user"))
}

async fn load_post(state: &AppState, post_id: Uuid) -> ApiResult<Post> {
    run_db(state, move |db| db.get_post(&post_id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("post"))
}

async fn append_log(
    state: &AppState,
    method: LogMethod,
    target_post_id: Uuid,
    actor_username: String,
    old_value: Option<Post>,
) -> ApiResult<LogEntry> {
    let entry = LogEntry {
        id: Uuid::new_v4(),
        method,
        target_post_id,
        actor_username,
        old_value,
        created_at: now(),
    };

    let row = entry.clone();
    run_db(state, move |db| db.insert_log(&row)).await?;
    Ok(entry)
}
