use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::middleware::RequireAdmin;
use crate::storage::{
    check_content_type, check_size, content_type_for, filename_from_url, is_safe_filename,
    stored_filename,
};
use crate::{error::CmsError, router::CmsState};

#[derive(Debug, Default, Deserialize)]
pub struct FileUrlQuery {
    pub url: Option<String>,
}

/// POST /api/upload -> multipart `file` part; returns the public URL.
pub async fn upload(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, CmsError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = field.bytes().await.map_err(bad_multipart)?;
        upload = Some((original, content_type, bytes));
        break;
    }
    let Some((original, content_type, bytes)) = upload else {
        return Err(CmsError::InvalidInput("no file provided".to_string()));
    };

    check_content_type(&content_type)?;
    check_size(bytes.len())?;

    let filename = stored_filename(&original, Utc::now().timestamp_millis());
    let size = bytes.len();
    let url = state.images.put(&filename, &content_type, bytes).await?;
    info!(
        store = state.images.kind(),
        %filename,
        content_type = %content_type,
        size,
        "image uploaded"
    );
    Ok(Json(json!({
        "success": true,
        "url": url,
        "filename": filename,
    })))
}

/// DELETE /api/upload/delete?url=<public url>
pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<CmsState>,
    Query(query): Query<FileUrlQuery>,
) -> Result<Json<Value>, CmsError> {
    let url = query
        .url
        .ok_or_else(|| CmsError::InvalidInput("missing `url` query parameter".to_string()))?;
    let filename = filename_from_url(&url)
        .ok_or_else(|| CmsError::InvalidInput(format!("no file name in {url}")))?;

    state.images.remove(filename).await?;
    info!(store = state.images.kind(), filename, "image deleted");
    Ok(Json(json!({ "success": true })))
}

/// GET /uploads/{filename} -> files kept by the local store.
pub async fn serve(
    State(state): State<CmsState>,
    Path(filename): Path<String>,
) -> Result<Response, CmsError> {
    if !is_safe_filename(&filename) {
        return Err(CmsError::FileMissing(filename));
    }
    let Some(bytes) = state.images.open(&filename).await? else {
        return Err(CmsError::FileMissing(filename));
    };
    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}

fn bad_multipart(e: MultipartError) -> CmsError {
    warn!(status = %e.status(), error = %e.body_text(), "rejected upload body");
    CmsError::InvalidInput(e.body_text())
}
