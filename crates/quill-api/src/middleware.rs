use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::error::ApiError;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// Identity injected into request extensions by [`require_auth`].
///
/// Trusted from the token signature alone. Handlers that need the full user
/// record look it up themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Extract and validate the session token from the `token` cookie.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthenticated)?;

    let user_id = state.tokens.verify(token)?;

    req.extensions_mut().insert(AuthUser { id: user_id });
    Ok(next.run(req).await)
}
