use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::info;

use super::{IdQuery, PublishedQuery, UpdateRequest};
use crate::db::{NewTestimonial, TestimonialUpdate};
use crate::middleware::RequireAdmin;
use crate::{error::CmsError, router::CmsState};

pub async fn list(
    State(state): State<CmsState>,
    Query(query): Query<PublishedQuery>,
) -> Result<Response, CmsError> {
    if let Some(id) = query.id {
        let testimonial = state.store.get_testimonial(id).await?;
        return Ok(Json(testimonial).into_response());
    }
    let mut testimonials = state.store.list_testimonials().await?;
    if let Some(published) = query.published {
        testimonials.retain(|t| t.published == published);
    }
    Ok(Json(testimonials).into_response())
}

pub async fn create(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Json(body): Json<NewTestimonial>,
) -> Result<Json<Value>, CmsError> {
    let testimonial = state.store.create_testimonial(body).await?;
    info!(id = testimonial.id, "testimonial created");
    Ok(Json(json!({ "success": true, "id": testimonial.id })))
}

pub async fn update(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Json(req): Json<UpdateRequest<TestimonialUpdate>>,
) -> Result<Json<Value>, CmsError> {
    let testimonial = state.store.update_testimonial(req.id, req.fields).await?;
    Ok(Json(json!({ "success": true, "testimonial": testimonial })))
}

pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, CmsError> {
    let id = query.require_id()?;
    state.store.delete_testimonial(id).await?;
    info!(id, "testimonial deleted");
    Ok(Json(json!({ "success": true })))
}
