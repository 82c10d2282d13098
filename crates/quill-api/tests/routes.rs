//! End-to-end tests over the full router.
//!
//! Each test gets an in-memory database and its own asset directory.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tower::ServiceExt;
use uuid::Uuid;

use quill_api::assets::AssetStore;
use quill_api::token::TokenKeys;
use quill_api::{AppState, AppStateInner, router};
use quill_db::Database;
use quill_types::api::{Dashboard, ErrorBody, PostPage, Profile, SearchResults, UserLogs};
use quill_types::models::{LogEntry, LogMethod, Post, User};

const BOUNDARY: &str = "quill-test-boundary";

// ========================================
// Test Helpers
// ========================================

async fn test_app(page_size: u32) -> (Router, AppState) {
    let dir = std::env::temp_dir().join(format!("quill-routes-{}", Uuid::new_v4()));
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        tokens: TokenKeys::new("routes-test-secret"),
        assets: AssetStore::new(dir).await.expect("asset dir"),
        page_size,
        secure_cookie: false,
    });
    (router(state.clone()), state)
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("router is infallible")
}

async fn json<T: DeserializeOwned>(resp: Response<Body>) -> T {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn form(method: &str, uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn upload(cookie: Option<&str>, title: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in [("title", title), ("body", "blog description")] {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"postImage\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/add-post")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

fn location(resp: &Response<Body>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect location")
}

/// `token=<jwt>` from the Set-Cookie header, ready to send back.
fn session_cookie(resp: &Response<Body>) -> String {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("token="))
        .and_then(|v| v.split(';').next())
        .expect("session cookie")
        .to_string()
}

async fn register(app: &Router, username: &str, password: &str) -> String {
    let resp = send(
        app,
        form("POST", "/register", &format!("username={username}&password={password}"), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");
    session_cookie(&resp)
}

async fn create_post(app: &Router, cookie: &str, title: &str) -> Post {
    let resp = send(app, upload(Some(cookie), title, "cover.png", "image/png", b"\x89PNG\r\n")).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");

    let dashboard: Dashboard = json(send(app, get("/dashboard", Some(cookie))).await).await;
    dashboard
        .posts
        .into_iter()
        .find(|p| p.title == title)
        .expect("created post is listed")
}

fn logs_for(state: &AppState, username: &str) -> Vec<LogEntry> {
    state.db.logs_by_user(username, 50).unwrap()
}

// ========================================
// Login / registration
// ========================================

#[tokio::test]
async fn registered_user_can_log_in() {
    let (app, state) = test_app(3).await;
    register(&app, "ada", "correct-horse").await;

    let resp = send(&app, form("POST", "/admin", "username=ada&password=correct-horse", None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");

    let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));

    let cookie = session_cookie(&resp);
    let token = cookie.trim_start_matches("token=");
    let user_id = state.tokens.verify(token).unwrap();
    let user = state.db.get_user(&user_id.to_string()).unwrap().unwrap();
    assert_eq!(user.username, "ada");
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let (app, _state) = test_app(3).await;
    register(&app, "ada", "correct-horse").await;

    let wrong = send(&app, form("POST", "/admin", "username=ada&password=battery-staple", None)).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(wrong.headers().get(header::SET_COOKIE).is_none());
    let wrong: ErrorBody = json(wrong).await;

    let unknown = send(&app, form("POST", "/admin", "username=nobody&password=battery-staple", None)).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown: ErrorBody = json(unknown).await;

    assert_eq!(wrong.error, "invalid_credentials");
    assert_eq!(wrong.message, unknown.message);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (app, state) = test_app(3).await;
    register(&app, "ada", "correct-horse").await;
    let original = state.db.get_user_by_username("ada").unwrap().unwrap();

    let resp = send(&app, form("POST", "/register", "username=ada&password=another-pass", None)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: ErrorBody = json(resp).await;
    assert_eq!(body.error, "username_taken");

    let after = state.db.get_user_by_username("ada").unwrap().unwrap();
    assert_eq!(after.id, original.id);
    assert_eq!(after.password, original.password);

    // The first password still works.
    let resp = send(&app, form("POST", "/admin", "username=ada&password=correct-horse", None)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn short_credentials_are_bad_requests() {
    let (app, _state) = test_app(3).await;
    let resp = send(&app, form("POST", "/register", "username=ab&password=correct-horse", None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = send(&app, form("POST", "/register", "username=ada&password=short", None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_form_redirects_only_valid_sessions() {
    let (app, _state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;

    let resp = send(&app, get("/admin", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");

    let resp = send(&app, get("/admin", Some("token=garbage"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let (app, _state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;

    let resp = send(&app, get("/logout", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("Max-Age=0"));
}

// ========================================
// Auth gate
// ========================================

#[tokio::test]
async fn admin_routes_reject_missing_or_forged_tokens() {
    let (app, state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;
    let post = create_post(&app, &cookie, "Keep Me").await;

    let forged = TokenKeys::new("someone-elses-secret")
        .issue(Uuid::new_v4())
        .unwrap();
    let forged = format!("token={forged}");

    for cookie in [None, Some("token="), Some("token=not-a-jwt"), Some(forged.as_str())] {
        let resp = send(&app, get("/dashboard", cookie)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/delete-post/{}", post.id))
            .header(header::COOKIE, cookie.unwrap_or(""))
            .body(Body::empty())
            .unwrap();
        let resp = send(&app, delete).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorBody = json(resp).await;
        assert_eq!(body.error, "unauthenticated");

        let resp = send(&app, form("PUT", &format!("/edit-post/{}", post.id), "title=x&body=y", cookie)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(&app, upload(cookie, "Sneaky", "a.png", "image/png", b"png")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    assert_eq!(state.db.count_posts().unwrap(), 1);
    assert_eq!(state.db.get_post(&post.id.to_string()).unwrap(), Some(post));
    assert_eq!(logs_for(&state, "ada").len(), 1);
}

// ========================================
// Mutation pipeline
// ========================================

#[tokio::test]
async fn create_post_stores_image_and_logs() {
    let (app, state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;

    let post = create_post(&app, &cookie, "First Post").await;
    assert!(post.image_url.starts_with("/img/"));
    assert!(post.image_url.ends_with(".png"));
    let path = state.assets.path_for_url(&post.image_url).unwrap();
    assert_eq!(tokio::fs::read(path).await.unwrap(), b"\x89PNG\r\n");

    let logs = logs_for(&state, "ada");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].method, LogMethod::Create);
    assert_eq!(logs[0].target_post_id, post.id);
    assert!(logs[0].old_value.is_none());
}

#[tokio::test]
async fn non_image_upload_is_rejected_without_side_effects() {
    let (app, state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;

    let resp = send(&app, upload(Some(&cookie), "Notes", "notes.txt", "text/plain", b"hello")).await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: ErrorBody = json(resp).await;
    assert_eq!(body.error, "unsupported_media_type");

    assert_eq!(state.db.count_posts().unwrap(), 0);
    assert!(logs_for(&state, "ada").is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected_without_side_effects() {
    let (app, state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;

    let image = vec![0u8; 11 * 1024 * 1024];
    let resp = send(&app, upload(Some(&cookie), "Huge", "huge.png", "image/png", &image)).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: ErrorBody = json(resp).await;
    assert_eq!(body.error, "payload_too_large");

    assert_eq!(state.db.count_posts().unwrap(), 0);
    assert!(logs_for(&state, "ada").is_empty());
    assert_eq!(std::fs::read_dir(state.assets.dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn edit_keeps_image_and_creation_time() {
    let (app, state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;
    let before = create_post(&app, &cookie, "Draft").await;

    let resp = send(
        &app,
        form(
            "PUT",
            &format!("/edit-post/{}", before.id),
            "title=Final+Title&body=rewritten+body",
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/post/{}", before.id));

    let after: Post = json(send(&app, get(&format!("/post/{}", before.id), None)).await).await;
    assert_eq!(after.title, "Final Title");
    assert_eq!(after.body, "rewritten body");
    assert_eq!(after.image_url, before.image_url);
    assert_eq!(after.created_at, before.created_at);

    let updates = state.db.logs_by_user_and_method(LogMethod::Update, "ada", 50).unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].old_value, Some(before));
}

#[tokio::test]
async fn delete_removes_post_and_logs_snapshot() {
    let (app, state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;
    let post = create_post(&app, &cookie, "Doomed").await;

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/delete-post/{}", post.id))
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, delete).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");

    let resp = send(&app, get(&format!("/post/{}", post.id), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let page: PostPage = json(send(&app, get("/", None)).await).await;
    assert!(page.posts.is_empty());

    let deletes = state.db.logs_by_user_and_method(LogMethod::Delete, "ada", 50).unwrap();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].old_value, Some(post.clone()));

    // The log survives the post and is readable by id.
    let entry: LogEntry = json(send(&app, get(&format!("/log/{}", deletes[0].id), Some(&cookie))).await).await;
    assert_eq!(entry.target_post_id, post.id);
}

#[tokio::test]
async fn editing_a_missing_post_is_not_found() {
    let (app, state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;

    let resp = send(
        &app,
        form("PUT", &format!("/edit-post/{}", Uuid::new_v4()), "title=x&body=y", Some(&cookie)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&app, get("/edit-post/not-a-uuid", Some(&cookie))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(logs_for(&state, "ada").is_empty());
}

// ========================================
// Public read path
// ========================================

#[tokio::test]
async fn pages_cover_every_post_once_newest_first() {
    let (app, state) = test_app(3).await;
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    for i in 0..8 {
        state
            .db
            .insert_post(&Post {
                id: Uuid::new_v4(),
                title: format!("Post {i}"),
                body: "blog description".into(),
                image_url: format!("/img/{i}.png"),
                created_at: base + Duration::hours(i),
            })
            .unwrap();
    }

    let mut seen = Vec::new();
    for page in 1..=3u32 {
        let resp: PostPage = json(send(&app, get(&format!("/?page={page}"), None)).await).await;
        assert_eq!(resp.current_page, page);
        let expected_next = if page < 3 { Some(page + 1) } else { None };
        assert_eq!(resp.next_page, expected_next);
        seen.extend(resp.posts);
    }

    let titles: Vec<&str> = seen.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(
        titles,
        ["Post 7", "Post 6", "Post 5", "Post 4", "Post 3", "Post 2", "Post 1", "Post 0"]
    );

    // No page parameter means page 1.
    let first: PostPage = json(send(&app, get("/", None)).await).await;
    assert_eq!(first.current_page, 1);
    assert_eq!(first.posts.len(), 3);

    let past_end: PostPage = json(send(&app, get("/?page=9", None)).await).await;
    assert!(past_end.posts.is_empty());
    assert_eq!(past_end.next_page, None);
}

#[tokio::test]
async fn search_matches_whole_title_only() {
    let (app, _state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;
    create_post(&app, &cookie, "Fifth Post").await;

    let hit: SearchResults = json(send(&app, form("POST", "/search", "searchInput=Fifth+Post", None)).await).await;
    assert_eq!(hit.posts.len(), 1);
    assert_eq!(hit.posts[0].title, "Fifth Post");

    let miss: SearchResults = json(send(&app, form("POST", "/search", "searchInput=Fifth", None)).await).await;
    assert!(miss.posts.is_empty());
}

#[tokio::test]
async fn malformed_input_answers_with_json_errors() {
    let (app, _state) = test_app(3).await;

    let requests = [
        get("/?page=abc", None),
        form("POST", "/search", "", None),
        form("POST", "/admin", "username=ada", None),
    ];
    for req in requests {
        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = json(resp).await;
        assert_eq!(body.error, "bad_request");
        assert!(!body.message.is_empty());
    }
}

// ========================================
// Profile and audit views
// ========================================

#[tokio::test]
async fn profile_update_and_activity() {
    let (app, _state) = test_app(3).await;
    let cookie = register(&app, "ada", "correct-horse").await;
    create_post(&app, &cookie, "Hello").await;

    let resp = send(
        &app,
        form("POST", "/profile", "email=ada%40example.com&phone=555-0100", Some(&cookie)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/dashboard");

    let profile: Profile = json(send(&app, get("/profile", Some(&cookie))).await).await;
    assert_eq!(profile.user.username, "ada");
    assert_eq!(profile.user.email.as_deref(), Some("ada@example.com"));
    assert_eq!(profile.user.phone.as_deref(), Some("555-0100"));
    assert_eq!(profile.logs.len(), 1);
    assert_eq!(profile.logs[0].method, LogMethod::Create);
}

#[tokio::test]
async fn other_users_and_their_logs() {
    let (app, _state) = test_app(3).await;
    let ada = register(&app, "ada", "correct-horse").await;
    let grace = register(&app, "grace", "battery-staple").await;
    let post = create_post(&app, &ada, "Shared").await;

    let resp = send(
        &app,
        form("PUT", &format!("/edit-post/{}", post.id), "title=Shared+v2&body=b", Some(&grace)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let users: Vec<User> = json(send(&app, get("/others", Some(&ada))).await).await;
    let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, ["ada", "grace"]);

    let ada_logs: UserLogs = json(send(&app, get("/other-logs/ada", Some(&grace))).await).await;
    assert_eq!(ada_logs.username, "ada");
    assert_eq!(ada_logs.logs.len(), 1);

    let filtered: UserLogs = json(
        send(&app, form("POST", "/other-logs", "method=UPDATE&username=grace", Some(&ada))).await,
    )
    .await;
    assert_eq!(filtered.logs.len(), 1);
    assert_eq!(filtered.logs[0].old_value.as_ref().map(|p| p.title.as_str()), Some("Shared"));

    let none: UserLogs = json(
        send(&app, form("POST", "/other-logs", "method=DELETE&username=grace", Some(&ada))).await,
    )
    .await;
    assert!(none.logs.is_empty());

    let resp = send(&app, get(&format!("/log/{}", Uuid::new_v4()), Some(&ada))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
