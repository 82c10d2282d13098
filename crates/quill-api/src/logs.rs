use axum::{
    Form, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;

use quill_types::api::{LogFilterForm, UserLogs};
use quill_types::models::LogEntry;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_db};

/// Entries shown when browsing another user's activity.
const OTHER_LOGS_LIMIT: u32 = 50;

/// GET /log/{id}
pub async fn show_log(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<LogEntry>> {
    let entry = run_db(&state, move |db| db.get_log(&id))
        .await?
        .ok_or(ApiError::NotFound("log entry"))?;
    Ok(Json(entry))
}

/// GET /other-logs/{username}
pub async fn user_logs(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<UserLogs>> {
    let name = username.clone();
    let logs = run_db(&state, move |db| db.logs_by_user(&name, OTHER_LOGS_LIMIT)).await?;
    Ok(Json(UserLogs { username, logs }))
}

/// POST /other-logs — filter by method and username.
pub async fn filter_logs(
    State(state): State<AppState>,
    WithRejection(Form(form), _): WithRejection<Form<LogFilterForm>, ApiError>,
) -> ApiResult<Json<UserLogs>> {
    let LogFilterForm { method, username } = form;
    let name = username.clone();
    let logs = run_db(&state, move |db| {
        db.logs_by_user_and_method(method, &name, OTHER_LOGS_LIMIT)
    })
    .await?;
    Ok(Json(UserLogs { username, logs }))
}
