use axum::{
    Extension, Form, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Redirect,
};
use axum_extra::extract::WithRejection;

use quill_types::api::{Dashboard, EditPostForm, FormView};
use quill_types::models::Post;

use crate::assets::ImageUpload;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::pipeline::{self, PostDraft, PostEdit};
use crate::posts::parse_post_id;
use crate::state::{AppState, run_db};

/// Multipart field carrying the post image.
pub const IMAGE_FIELD: &str = "postImage";

/// GET /dashboard — every post, newest first, plus who is signed in.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Dashboard>> {
    let id = user.id.to_string();
    let (account, posts) = run_db(&state, move |db| Ok((db.get_user(&id)?, db.list_all_posts()?))).await?;
    let account = account.ok_or(ApiError::NotFound("user"))?;

    Ok(Json(Dashboard {
        username: account.username,
        posts,
    }))
}

/// GET /add-post
pub async fn add_post_form() -> Json<FormView> {
    Json(FormView::default())
}

/// POST /add-post — multipart with `title`, `body` and `postImage`.
pub async fn add_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<Redirect> {
    let draft = read_post_form(&mut multipart).await?;
    pipeline::create_post(&state, user, draft).await?;
    Ok(Redirect::to("/dashboard"))
}

/// GET /edit-post/{id}
pub async fn edit_post_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Post>> {
    let id = parse_post_id(&id)?;
    let post = run_db(&state, move |db| db.get_post(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post))
}

/// PUT /edit-post/{id}
pub async fn edit_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Form(form), _): WithRejection<Form<EditPostForm>, ApiError>,
) -> ApiResult<Redirect> {
    let id = parse_post_id(&id)?;
    let edit = PostEdit {
        title: form.title,
        body: form.body,
    };
    pipeline::update_post(&state, user, id, edit).await?;
    Ok(Redirect::to(&format!("/post/{}", id)))
}

/// DELETE /delete-post/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Redirect> {
    let id = parse_post_id(&id)?;
    pipeline::delete_post(&state, user, id).await?;
    Ok(Redirect::to("/dashboard"))
}

async fn read_post_form(multipart: &mut Multipart) -> ApiResult<PostDraft> {
    let mut title = None;
    let mut body = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(field.text().await.map_err(bad_multipart)?),
            "body" => body = Some(field.text().await.map_err(bad_multipart)?),
            IMAGE_FIELD => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| ApiError::BadRequest(format!("Missing {} field", IMAGE_FIELD)))?;

    Ok(PostDraft {
        title: title.unwrap_or_default(),
        body: body.unwrap_or_default(),
        image,
    })
}

/// Bodies over the router's limit surface here, while the fields are read.
fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(e.body_text())
    }
}
