use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use axum_extra::extract::cookie::Key;
use serde_json::{Value, json};
use tracing::warn;

use crate::db::ContentStore;
use crate::handlers::{auth, banners, contact, history, posts, testimonials, upload};
use crate::storage::{ImageStore, MAX_IMAGE_BYTES};

/// Multipart framing around a maximum-size file.
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// Shared handler state. The stores are constructed once at startup and every
/// request borrows the same instances.
#[derive(Clone)]
pub struct CmsState {
    pub store: Arc<dyn ContentStore>,
    pub images: Arc<dyn ImageStore>,
    pub insecure_cookie: bool,
    cookie_key: Key,
}

impl CmsState {
    pub fn new(
        store: Arc<dyn ContentStore>,
        images: Arc<dyn ImageStore>,
        cookie_key: Key,
        insecure_cookie: bool,
    ) -> Self {
        Self {
            store,
            images,
            insecure_cookie,
            cookie_key,
        }
    }
}

impl FromRef<CmsState> for Key {
    fn from_ref(state: &CmsState) -> Self {
        state.cookie_key.clone()
    }
}

/// Derive the cookie key from `secret`, or generate a throwaway key so the
/// server still starts (sessions then die with the process).
pub fn cookie_key(secret: Option<&str>) -> Key {
    match secret {
        Some(s) if s.len() >= 32 => Key::derive_from(s.as_bytes()),
        Some(_) => {
            warn!("COOKIE_SECRET shorter than 32 bytes; using a random session key");
            Key::generate()
        }
        None => {
            warn!("COOKIE_SECRET not set; using a random session key");
            Key::generate()
        }
    }
}

pub fn cms_router(state: CmsState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/banners",
            get(banners::list)
                .post(banners::create)
                .put(banners::update)
                .delete(banners::delete),
        )
        .route(
            "/api/posts",
            get(posts::list)
                .post(posts::create)
                .put(posts::update)
                .delete(posts::delete),
        )
        .route(
            "/api/testimonials",
            get(testimonials::list)
                .post(testimonials::create)
                .put(testimonials::update)
                .delete(testimonials::delete),
        )
        .route(
            "/api/history",
            get(history::list)
                .post(history::create)
                .put(history::update)
                .delete(history::delete),
        )
        .route(
            "/api/contact",
            get(contact::list)
                .post(contact::create)
                .put(contact::update)
                .delete(contact::delete),
        )
        .route(
            "/api/contact/{id}",
            put(contact::update_by_path).delete(contact::delete_by_path),
        )
        .route(
            "/api/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/upload/delete", delete(upload::delete))
        .route("/uploads/{filename}", get(upload::serve))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
