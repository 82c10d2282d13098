use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{admin, auth, logs, posts, profile};

/// 10 MB cap on admin request bodies (image uploads)
const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// All routes. Admin routes sit behind [`require_auth`], which rejects the
/// request before any handler runs.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(posts::index))
        .route("/about", get(posts::about))
        .route("/post/{id}", get(posts::show_post))
        .route("/search", post(posts::search))
        .route("/admin", get(auth::login_form).post(auth::login))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/logout", get(auth::logout));

    let protected_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/add-post", get(admin::add_post_form).post(admin::add_post))
        .route("/edit-post/{id}", get(admin::edit_post_form).put(admin::edit_post))
        .route("/delete-post/{id}", delete(admin::delete_post))
        .route("/profile", get(profile::show_profile).post(profile::update_profile))
        .route("/others", get(profile::others))
        .route("/log/{id}", get(logs::show_log))
        .route("/other-logs", post(logs::filter_logs))
        .route("/other-logs/{username}", get(logs::user_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
