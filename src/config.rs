use std::fmt::Display;
use std::str::FromStr;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Deserializer, Serialize, de};
use url::Url;

/// Environment keys read into [`Config`]. Unlisted variables are ignored.
const ENV_KEYS: &[&str] = &[
    "DATABASE_TYPE",
    "DATABASE_URL",
    "SUPABASE_URL",
    "SUPABASE_SERVICE_ROLE_KEY",
    "SUPABASE_ANON_KEY",
    "LISTEN_ADDR",
    "LOGLEVEL",
    "COOKIE_SECRET",
    "INSECURE_COOKIE",
    "ADMIN_USERNAME",
    "ADMIN_PASSWORD",
    "UPLOAD_DIR",
];

/// Older deployments export these with a `NEXT_PUBLIC_` prefix.
const LEGACY_KEYS: &[&str] = &["SUPABASE_URL", "SUPABASE_ANON_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend selector; `supabase` picks the hosted adapter, anything else SQLite.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub database_type: Option<String>,
    pub database_url: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub supabase_url: Option<Url>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub supabase_service_role_key: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub supabase_anon_key: Option<String>,
    pub listen_addr: String,
    pub loglevel: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub cookie_secret: Option<String>,
    pub insecure_cookie: bool,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub admin_username: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub admin_password: Option<String>,
    /// Local image directory, used when hosted storage is not configured.
    pub upload_dir: String,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyEnv {
    #[serde(default, deserialize_with = "empty_as_none")]
    supabase_url: Option<Url>,
    #[serde(default, deserialize_with = "empty_as_none")]
    supabase_anon_key: Option<String>,
}

/// `KEY=` in the environment means unset. Scalars that the env provider
/// parsed as numbers or booleans are read back as their text.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_type: None,
            database_url: "sqlite:clinic.db".to_string(),
            supabase_url: None,
            supabase_service_role_key: None,
            supabase_anon_key: None,
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            cookie_secret: None,
            insecure_cookie: false,
            admin_username: None,
            admin_password: None,
            upload_dir: "public/uploads".to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with process environment variables. The legacy
    /// `NEXT_PUBLIC_*` names only fill keys the direct names leave unset.
    pub fn from_env() -> Result<Self, figment::Error> {
        let mut cfg: Config = Self::figment().extract()?;
        let legacy: LegacyEnv =
            Figment::from(Env::prefixed("NEXT_PUBLIC_").only(LEGACY_KEYS)).extract()?;
        cfg.supabase_url = cfg.supabase_url.or(legacy.supabase_url);
        cfg.supabase_anon_key = cfg.supabase_anon_key.or(legacy.supabase_anon_key);
        Ok(cfg)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::raw().only(ENV_KEYS))
    }

    /// Service-role key wins over the anon key; an empty key counts as unset.
    pub fn supabase_key(&self) -> Option<&str> {
        non_empty(self.supabase_service_role_key.as_deref())
            .or_else(|| non_empty(self.supabase_anon_key.as_deref()))
    }

    /// Hosted image storage needs the project URL and the service-role key.
    pub fn storage_credentials(&self) -> Option<(&Url, &str)> {
        let url = self.supabase_url.as_ref()?;
        let key = non_empty(self.supabase_service_role_key.as_deref())?;
        Some((url, key))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
