use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use super::ImageStore;
use crate::db::supabase::{authorized_client, status_code};
use crate::error::CmsError;

const BUCKET: &str = "images";

/// Supabase Storage, bucket `images`, under `{base}/storage/v1/object/`.
#[derive(Clone)]
pub struct SupabaseImageStore {
    client: reqwest::Client,
    base_url: Url,
}

/// Storage API error body: `{"statusCode": "409", "error": "Duplicate", "message": ...}`.
#[derive(Debug, Default, Deserialize)]
struct StorageError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

impl SupabaseImageStore {
    pub fn new(base_url: &Url, service_key: &str) -> Result<Self, CmsError> {
        let client = authorized_client(service_key)?;
        info!(url = %base_url, bucket = BUCKET, "Supabase image storage ready");
        Ok(Self {
            client,
            base_url: base_url.clone(),
        })
    }

    fn storage_url(&self, segments: &[&str]) -> Result<Url, CmsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CmsError::Internal("Supabase URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["storage", "v1", "object"])
            .extend(segments);
        Ok(url)
    }

    /// Address the bucket serves `filename` from without authentication.
    pub fn public_url(&self, filename: &str) -> Result<Url, CmsError> {
        self.storage_url(&["public", BUCKET, filename])
    }
}

#[async_trait]
impl ImageStore for SupabaseImageStore {
    fn kind(&self) -> &'static str {
        "supabase"
    }

    async fn put(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, CmsError> {
        let url = self.storage_url(&[BUCKET, filename])?;
        debug!(filename, len = bytes.len(), "uploading image");
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(self.public_url(filename)?.to_string())
    }

    async fn remove(&self, filename: &str) -> Result<(), CmsError> {
        let url = self.storage_url(&[BUCKET])?;
        debug!(filename, "removing image");
        let resp = self
            .client
            .delete(url)
            .json(&json!({ "prefixes": [filename] }))
            .send()
            .await?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<(), CmsError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.bytes().await.map_err(|e| {
        warn!(%status, error = %e, "failed to read storage error body");
        e
    })?;
    let err = serde_json::from_slice::<StorageError>(&body).unwrap_or_default();
    Err(CmsError::Backend {
        status,
        code: if err.error.is_empty() {
            status_code(status)
        } else {
            err.error
        },
        message: if err.message.is_empty() {
            String::from_utf8_lossy(&body).into_owned()
        } else {
            err.message
        },
    })
}
