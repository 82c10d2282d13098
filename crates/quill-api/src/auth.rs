use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::SaltString,
};
use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{CookieJar, WithRejection};
use rand_core::OsRng;
use tracing::{debug, info};
use uuid::Uuid;

use quill_db::UserInsert;
use quill_db::models::format_timestamp;
use quill_types::api::{FormView, LoginForm, RegisterForm};

use crate::error::{ApiError, ApiResult};
use crate::session::{SESSION_COOKIE, removal_cookie, session_cookie};
use crate::state::{AppState, run_db};

/// GET /admin — login form, or straight to the dashboard with a valid session.
pub async fn login_form(State(state): State<AppState>, jar: CookieJar) -> Response {
    let signed_in = jar
        .get(SESSION_COOKIE)
        .is_some_and(|c| state.tokens.verify(c.value()).is_ok());

    if signed_in {
        Redirect::to("/dashboard").into_response()
    } else {
        Json(FormView::default()).into_response()
    }
}

/// POST /admin
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Form(form), _): WithRejection<Form<LoginForm>, ApiError>,
) -> ApiResult<(CookieJar, Redirect)> {
    let token = authenticate(&state, form.username, form.password).await?;
    let jar = jar.add(session_cookie(token, state.secure_cookie));
    Ok((jar, Redirect::to("/dashboard")))
}

/// GET /register
pub async fn register_form() -> Json<FormView> {
    Json(FormView::default())
}

/// POST /register — creates the account and signs it in.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Form(form), _): WithRejection<Form<RegisterForm>, ApiError>,
) -> ApiResult<(CookieJar, Redirect)> {
    let token = register_user(&state, form.username, form.password).await?;
    let jar = jar.add(session_cookie(token, state.secure_cookie));
    Ok((jar, Redirect::to("/dashboard")))
}

/// GET /logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.remove(removal_cookie()), Redirect::to("/"))
}

/// Check a username/password pair and issue a session token.
///
/// "No such user" and "wrong password" are indistinguishable to the caller.
pub async fn authenticate(state: &AppState, username: String, password: String) -> ApiResult<String> {
    let lookup = username.clone();
    let user = run_db(state, move |db| db.get_user_by_username(&lookup)).await?;

    let Some(user) = user else {
        debug!("Login failed for '{}': no such user", username);
        return Err(ApiError::InvalidCredentials);
    };

    let stored_hash = user.password;
    let verified = tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| anyhow::anyhow!("Corrupt password hash: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    if !verified {
        debug!("Login failed for '{}': password mismatch", username);
        return Err(ApiError::InvalidCredentials);
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt user id '{}': {}", user.id, e))?;

    Ok(state.tokens.issue(user_id)?)
}

/// Create an account and issue a session token for it.
pub async fn register_user(state: &AppState, username: String, password: String) -> ApiResult<String> {
    // Validate input
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::BadRequest("Username must be 3-32 characters".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::BadRequest("Password must be at least 8 characters".into()));
    }

    let user_id = Uuid::new_v4();
    let name = username.clone();

    let outcome = run_db(state, move |db| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
            .to_string();

        db.create_user(
            &user_id.to_string(),
            &name,
            &password_hash,
            &format_timestamp(chrono::Utc::now()),
        )
    })
    .await?;

    if outcome == UserInsert::UsernameTaken {
        return Err(ApiError::UsernameTaken);
    }

    info!("Registered user '{}' ({})", username, user_id);
    Ok(state.tokens.issue(user_id)?)
}
