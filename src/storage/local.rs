use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;
use tracing::{debug, info};

use super::ImageStore;
use crate::error::CmsError;

/// Public URL prefix for files kept on local disk.
pub const LOCAL_URL_PREFIX: &str = "/uploads/";

/// Uploads written under a local directory and served by this process.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn put(
        &self,
        filename: &str,
        _content_type: &str,
        bytes: Bytes,
    ) -> Result<String, CmsError> {
        if tokio::fs::metadata(&self.dir).await.is_err() {
            info!(dir = %self.dir.display(), "creating upload directory");
            tokio::fs::create_dir_all(&self.dir).await?;
        }
        let path = self.dir.join(filename);
        tokio::fs::write(&path, &bytes).await?;
        debug!(path = %path.display(), len = bytes.len(), "image written");
        Ok(format!("{LOCAL_URL_PREFIX}{filename}"))
    }

    async fn remove(&self, filename: &str) -> Result<(), CmsError> {
        match tokio::fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(CmsError::FileMissing(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, filename: &str) -> Result<Option<Bytes>, CmsError> {
        match tokio::fs::read(self.dir.join(filename)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
