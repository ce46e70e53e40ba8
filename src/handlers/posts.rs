use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::info;

use super::{IdQuery, PublishedQuery, UpdateRequest};
use crate::db::{NewPost, PostUpdate};
use crate::middleware::RequireAdmin;
use crate::{error::CmsError, router::CmsState};

/// GET /api/posts -> newest first. `?published=true` is the public listing;
/// `?id=` returns one post regardless of its published flag.
pub async fn list(
    State(state): State<CmsState>,
    Query(query): Query<PublishedQuery>,
) -> Result<Response, CmsError> {
    if let Some(id) = query.id {
        let post = state.store.get_post(id).await?;
        return Ok(Json(post).into_response());
    }
    let mut posts = state.store.list_posts().await?;
    if let Some(published) = query.published {
        posts.retain(|p| p.published == published);
    }
    Ok(Json(posts).into_response())
}

pub async fn create(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Json(body): Json<NewPost>,
) -> Result<Json<Value>, CmsError> {
    let post = state.store.create_post(body).await?;
    info!(id = post.id, published = post.published, "post created");
    Ok(Json(json!({ "success": true, "id": post.id })))
}

pub async fn update(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Json(req): Json<UpdateRequest<PostUpdate>>,
) -> Result<Json<Value>, CmsError> {
    let post = state.store.update_post(req.id, req.fields).await?;
    Ok(Json(json!({ "success": true, "post": post })))
}

pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, CmsError> {
    let id = query.require_id()?;
    state.store.delete_post(id).await?;
    info!(id, "post deleted");
    Ok(Json(json!({ "success": true })))
}
