use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::info;

use super::{IdQuery, UpdateRequest};
use crate::db::{BannerUpdate, NewBanner};
use crate::middleware::RequireAdmin;
use crate::{error::CmsError, router::CmsState};

/// GET /api/banners -> all banners in carousel order, or one with `?id=`.
pub async fn list(
    State(state): State<CmsState>,
    Query(query): Query<IdQuery>,
) -> Result<Response, CmsError> {
    if let Some(id) = query.id {
        let banner = state.store.get_banner(id).await?;
        return Ok(Json(banner).into_response());
    }
    Ok(Json(state.store.list_banners().await?).into_response())
}

pub async fn create(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Json(body): Json<NewBanner>,
) -> Result<Json<Value>, CmsError> {
    let banner = state.store.create_banner(body).await?;
    info!(id = banner.id, "banner created");
    Ok(Json(json!({ "success": true, "id": banner.id })))
}

pub async fn update(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Json(req): Json<UpdateRequest<BannerUpdate>>,
) -> Result<Json<Value>, CmsError> {
    let banner = state.store.update_banner(req.id, req.fields).await?;
    Ok(Json(json!({ "success": true, "banner": banner })))
}

pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, CmsError> {
    let id = query.require_id()?;
    state.store.delete_banner(id).await?;
    info!(id, "banner deleted");
    Ok(Json(json!({ "success": true })))
}
