use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::Utc;
use time::Duration;

use crate::error::CmsError;

pub const SESSION_COOKIE: &str = "admin_session";

/// Sessions older than this are rejected even if the browser still sends them.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Admin session pulled from the encrypted `admin_session` cookie.
///
/// The cookie carries `<username>|<issued-at millis>`; it is encrypted with the
/// server key, so its contents can be trusted once decrypted.
#[derive(Debug, Clone)]
pub struct RequireAdmin {
    pub username: String,
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = CmsError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .map_err(|_| CmsError::Unauthorized)?;
        let cookie = jar.get(SESSION_COOKIE).ok_or(CmsError::Unauthorized)?;
        let username = parse_session(cookie.value(), Utc::now().timestamp_millis())
            .ok_or(CmsError::Unauthorized)?;
        Ok(Self { username })
    }
}

pub fn session_value(username: &str, issued_at_ms: i64) -> String {
    format!("{username}|{issued_at_ms}")
}

/// Returns the username when the session value is well formed and unexpired.
pub fn parse_session(value: &str, now_ms: i64) -> Option<String> {
    let (username, issued) = value.rsplit_once('|')?;
    let issued: i64 = issued.parse().ok()?;
    let age_ms = now_ms - issued;
    let ttl_ms = SESSION_TTL_DAYS * 24 * 60 * 60 * 1000;
    (!username.is_empty() && (0..=ttl_ms).contains(&age_ms)).then(|| username.to_string())
}

pub fn build_session_cookie(username: &str, insecure: bool) -> Cookie<'static> {
    let value = session_value(username, Utc::now().timestamp_millis());
    Cookie::build(Cookie::new(SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(!insecure)
        .same_site(SameSite::Strict)
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}
