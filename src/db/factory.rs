use crate::config::Config;
use crate::db::ContentStore;
use crate::db::sqlite::SqliteStore;
use crate::db::supabase::SupabaseStore;
use crate::error::CmsError;
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Supabase,
}

impl DatabaseBackend {
    /// Case-insensitive; unknown or absent names select SQLite.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("supabase") => Self::Supabase,
            _ => Self::Sqlite,
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => f.write_str("sqlite"),
            Self::Supabase => f.write_str("supabase"),
        }
    }
}

/// Construct the configured backend. Call once at startup and share the
/// returned handle; construction errors are fatal and never fall back to
/// another backend.
pub async fn open_store(cfg: &Config) -> Result<Arc<dyn ContentStore>, CmsError> {
    let backend = DatabaseBackend::from_name(cfg.database_type.as_deref());
    info!(%backend, "opening content store");
    let store: Arc<dyn ContentStore> = match backend {
        DatabaseBackend::Supabase => Arc::new(SupabaseStore::from_config(cfg)?),
        DatabaseBackend::Sqlite => Arc::new(SqliteStore::connect(&cfg.database_url).await?),
    };
    Ok(store)
}
