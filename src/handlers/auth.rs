use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::middleware::auth::{build_session_cookie, clear_session_cookie};
use crate::service::admin::verify_password;
use crate::{error::CmsError, router::CmsState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/auth/login -> verifies the bcrypt hash and sets the session cookie.
pub async fn login(
    State(state): State<CmsState>,
    jar: PrivateCookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<Response, CmsError> {
    let Some(user) = state.store.get_admin_user(&req.username).await? else {
        warn!(username = %req.username, "login rejected: unknown user");
        return Err(CmsError::Unauthorized);
    };

    match verify_password(req.password, user.password_hash).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(username = %user.username, "login rejected: wrong password");
            return Err(CmsError::Unauthorized);
        }
        Err(CmsError::PasswordHash(e)) => {
            warn!(
                username = %user.username,
                error = %e,
                "login rejected: unreadable password hash"
            );
            return Err(CmsError::Unauthorized);
        }
        Err(e) => return Err(e),
    }

    let jar = jar.add(build_session_cookie(&user.username, state.insecure_cookie));
    info!(username = %user.username, "admin logged in");
    Ok((jar, Json(json!({ "success": true }))).into_response())
}

/// POST /api/auth/logout
pub async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    let jar = jar.remove(clear_session_cookie());
    (jar, Json(json!({ "success": true })))
}
