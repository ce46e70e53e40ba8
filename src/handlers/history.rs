use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::info;

use super::{IdQuery, UpdateRequest};
use crate::db::{HistoryItemUpdate, NewHistoryItem};
use crate::middleware::RequireAdmin;
use crate::{error::CmsError, router::CmsState};

/// GET /api/history -> the timeline in `order_index` order, or one item with `?id=`.
pub async fn list(
    State(state): State<CmsState>,
    Query(query): Query<IdQuery>,
) -> Result<Response, CmsError> {
    if let Some(id) = query.id {
        let item = state.store.get_history_item(id).await?;
        return Ok(Json(item).into_response());
    }
    Ok(Json(state.store.list_history_items().await?).into_response())
}

pub async fn create(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Json(body): Json<NewHistoryItem>,
) -> Result<Json<Value>, CmsError> {
    let item = state.store.create_history_item(body).await?;
    info!(id = item.id, "history item created");
    Ok(Json(json!({ "success": true, "id": item.id })))
}

pub async fn update(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Json(req): Json<UpdateRequest<HistoryItemUpdate>>,
) -> Result<Json<Value>, CmsError> {
    let item = state.store.update_history_item(req.id, req.fields).await?;
    Ok(Json(json!({ "success": true, "item": item })))
}

pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, CmsError> {
    let id = query.require_id()?;
    state.store.delete_history_item(id).await?;
    info!(id, "history item deleted");
    Ok(Json(json!({ "success": true })))
}
