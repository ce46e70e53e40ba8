//! Image storage for admin uploads.
//!
//! Files land either in the hosted `images` bucket or in a local directory
//! that the server exposes under `/uploads/`. The choice depends only on
//! whether hosted storage credentials are configured, not on the content
//! backend.

pub mod local;
pub mod supabase;

pub use local::LocalImageStore;
pub use supabase::SupabaseImageStore;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use tracing::info;

use crate::config::Config;
use crate::error::CmsError;

/// Upload size ceiling (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Short backend name for logs.
    fn kind(&self) -> &'static str;

    /// Store `bytes` under `filename` and return the public URL.
    async fn put(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, CmsError>;

    /// Remove a stored file. Missing files are reported as
    /// [`CmsError::FileMissing`] where the backend can tell.
    async fn remove(&self, filename: &str) -> Result<(), CmsError>;

    /// Raw bytes of a stored file, for stores the server itself serves.
    async fn open(&self, _filename: &str) -> Result<Option<Bytes>, CmsError> {
        Ok(None)
    }
}

/// Hosted bucket when both the project URL and the service-role key are
/// set, local directory otherwise.
pub fn open_image_store(cfg: &Config) -> Result<Arc<dyn ImageStore>, CmsError> {
    let store: Arc<dyn ImageStore> = match cfg.storage_credentials() {
        Some((url, key)) => Arc::new(SupabaseImageStore::new(url, key)?),
        None => Arc::new(LocalImageStore::new(&cfg.upload_dir)),
    };
    info!(kind = store.kind(), "image store ready");
    Ok(store)
}

pub fn check_content_type(content_type: &str) -> Result<(), CmsError> {
    if ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Ok(());
    }
    Err(CmsError::InvalidInput(format!(
        "file type {content_type} not allowed; use JPG, PNG, GIF or WebP"
    )))
}

pub fn check_size(len: usize) -> Result<(), CmsError> {
    if len <= MAX_IMAGE_BYTES {
        return Ok(());
    }
    let mib = len as f64 / (1024.0 * 1024.0);
    Err(CmsError::InvalidInput(format!(
        "file too large ({mib:.2}MB); maximum is 5MB"
    )))
}

/// `<epoch-ms>-<name>`, where every run of characters outside
/// `[A-Za-z0-9._-]` in the client's file name collapses into one `-`.
/// Only the last path component of the client name is used.
pub fn stored_filename(original: &str, now_ms: i64) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        if is_name_char(c) {
            cleaned.push(c);
        } else if !cleaned.ends_with('-') {
            cleaned.push('-');
        }
    }
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        format!("{now_ms}-upload")
    } else {
        format!("{now_ms}-{cleaned}")
    }
}

/// Last path segment of a public URL (query and fragment ignored), if it
/// names a file this module could have stored.
pub fn filename_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default();
    is_safe_filename(name).then_some(name)
}

pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && name.chars().all(is_name_char)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

/// Content type for serving a stored file, from its extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
