use axum::{
    Extension, Form, Json,
    extract::State,
    response::Redirect,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use quill_types::api::{Profile, ProfileForm};
use quill_types::models::User;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::{AppState, run_db};

/// Entries shown on the profile page.
const PROFILE_LOG_LIMIT: u32 = 20;

/// GET /profile — own account plus recent activity.
pub async fn show_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Profile>> {
    let id = user.id.to_string();
    let profile = run_db(&state, move |db| {
        let Some(user) = db.get_user(&id)? else {
            return Ok(None);
        };
        let logs = db.logs_by_user(&user.username, PROFILE_LOG_LIMIT)?;
        Ok(Some(Profile { user, logs }))
    })
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(profile))
}

/// POST /profile — replaces email and phone. Blank input clears a field.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Form(form), _): WithRejection<Form<ProfileForm>, ApiError>,
) -> ApiResult<Redirect> {
    let id = user.id.to_string();
    let email = non_blank(form.email);
    let phone = non_blank(form.phone);

    let found = run_db(&state, move |db| {
        db.update_profile(&id, email.as_deref(), phone.as_deref())
    })
    .await?;
    if !found {
        return Err(ApiError::NotFound("user"));
    }

    info!("Profile updated for {}", user.id);
    Ok(Redirect::to("/dashboard"))
}

/// GET /others — every account, password hashes excluded.
pub async fn others(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let users = run_db(&state, |db| db.list_users()).await?;
    Ok(Json(users))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
