use crate::db::{ContentStore, NewAdminUser};
use crate::error::CmsError;
use tracing::info;

/// Hash on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, CmsError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| CmsError::Internal(format!("hash task failed: {e}")))?
        .map_err(CmsError::from)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, CmsError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| CmsError::Internal(format!("verify task failed: {e}")))?
        .map_err(CmsError::from)
}

/// Create the admin account unless one with `username` already exists.
/// Returns whether a row was created. Existing rows are never modified.
pub async fn ensure_admin(
    store: &dyn ContentStore,
    username: &str,
    password: &str,
) -> Result<bool, CmsError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(CmsError::InvalidInput(
            "admin username and password must be non-empty".to_string(),
        ));
    }
    if store.get_admin_user(username).await?.is_some() {
        info!(username = %username, "admin user already present");
        return Ok(false);
    }

    let password_hash = hash_password(password.to_owned()).await?;
    let user = store
        .create_admin_user(NewAdminUser {
            username: username.to_owned(),
            password_hash,
        })
        .await?;
    info!(id = user.id, username = %user.username, "admin user created");
    Ok(true)
}
