use axum::{
    Form, Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use quill_types::api::{PageQuery, PostPage, SearchForm, SearchResults};
use quill_types::models::Post;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_db};

const ABOUT: &str = "Quill is a small blog. Posts are written by its admins; \
                     anyone can read and search them.";

/// GET /?page=N — newest posts first, `page_size` per page.
pub async fn index(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, ApiError>,
) -> ApiResult<Json<PostPage>> {
    let page = list_page(&state, query.page.unwrap_or(1)).await?;
    Ok(Json(page))
}

pub async fn about() -> &'static str {
    ABOUT
}

/// GET /post/{id}
pub async fn show_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Post>> {
    let id = parse_post_id(&id)?;
    let post = run_db(&state, move |db| db.get_post(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post))
}

/// POST /search — exact match on title or body, no substring matching.
pub async fn search(
    State(state): State<AppState>,
    WithRejection(Form(form), _): WithRejection<Form<SearchForm>, ApiError>,
) -> ApiResult<Json<SearchResults>> {
    let query = form.search_input;
    let needle = query.clone();
    let posts = run_db(&state, move |db| db.search_posts(&needle)).await?;
    Ok(Json(SearchResults { query, posts }))
}

/// One page of the public listing. Pages below 1 are treated as 1.
pub async fn list_page(state: &AppState, page: u32) -> ApiResult<PostPage> {
    let page = page.max(1);
    let page_size = state.page_size;
    let offset = u64::from(page - 1) * u64::from(page_size);

    let (posts, total) = run_db(state, move |db| {
        Ok((db.list_posts(page_size, offset)?, db.count_posts()?))
    })
    .await?;

    Ok(PostPage {
        posts,
        current_page: page,
        next_page: next_page(page, page_size, total),
    })
}

/// Next page number, if any posts remain past `page`.
pub fn next_page(page: u32, page_size: u32, total: u64) -> Option<u32> {
    let shown = u64::from(page) * u64::from(page_size);
    (shown < total).then(|| page + 1)
}

/// Malformed ids cannot name a stored post, so they are NotFound rather than
/// a bad request.
pub(crate) fn parse_post_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse().map_err(|_| ApiError::NotFound("post"))
}
