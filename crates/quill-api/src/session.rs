use axum_extra::extract::cookie::{Cookie, SameSite};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// HttpOnly session cookie with no Max-Age; it lives for the browser session.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Cookie to hand to `CookieJar::remove`. Path must match the one set at login.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
