use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::info;

use super::{IdQuery, UpdateRequest};
use crate::db::{ContactCardUpdate, NewContactCard};
use crate::middleware::RequireAdmin;
use crate::{error::CmsError, router::CmsState};

pub async fn list(
    State(state): State<CmsState>,
    Query(query): Query<IdQuery>,
) -> Result<Response, CmsError> {
    if let Some(id) = query.id {
        let card = state.store.get_contact_card(id).await?;
        return Ok(Json(card).into_response());
    }
    Ok(Json(state.store.list_contact_cards().await?).into_response())
}

pub async fn create(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Json(body): Json<NewContactCard>,
) -> Result<Json<Value>, CmsError> {
    let card = state.store.create_contact_card(body).await?;
    info!(id = card.id, kind = %card.kind, "contact card created");
    Ok(Json(json!({ "success": true, "id": card.id })))
}

pub async fn update(
    admin: RequireAdmin,
    state: State<CmsState>,
    Json(req): Json<UpdateRequest<ContactCardUpdate>>,
) -> Result<Json<Value>, CmsError> {
    update_by_path(admin, state, Path(req.id), Json(req.fields)).await
}

/// PUT /api/contact/{id}
pub async fn update_by_path(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Path(id): Path<i64>,
    Json(fields): Json<ContactCardUpdate>,
) -> Result<Json<Value>, CmsError> {
    let card = state.store.update_contact_card(id, fields).await?;
    Ok(Json(json!({ "success": true, "card": card })))
}

pub async fn delete(
    admin: RequireAdmin,
    state: State<CmsState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, CmsError> {
    let id = query.require_id()?;
    delete_by_path(admin, state, Path(id)).await
}

/// DELETE /api/contact/{id}
pub async fn delete_by_path(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, CmsError> {
    state.store.delete_contact_card(id).await?;
    info!(id, "contact card deleted");
    Ok(Json(json!({ "success": true })))
}
