use crate::config::Config;
use crate::db::ContentStore;
use crate::db::factory::DatabaseBackend;
use crate::db::models::*;
use crate::error::{CmsError, PostgrestError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

/// Media type that makes PostgREST answer with a single JSON object
/// (or a `PGRST116` error when no row matches).
const OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

/// Hosted adapter: the Supabase PostgREST API under `{base}/rest/v1/`.
#[derive(Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    rest_url: Url,
}

impl SupabaseStore {
    /// Build a client that authenticates every request with `api_key`.
    pub fn new(base_url: &Url, api_key: &str) -> Result<Self, CmsError> {
        let client = authorized_client(api_key)?;
        let rest_url = base_url.join("rest/v1/")?;

        Ok(Self { client, rest_url })
    }

    /// Both the project URL and a key are required; either missing is fatal.
    pub fn from_config(cfg: &Config) -> Result<Self, CmsError> {
        let url = cfg
            .supabase_url
            .as_ref()
            .ok_or(CmsError::MissingConfig("SUPABASE_URL"))?;
        let key = cfg
            .supabase_key()
            .ok_or(CmsError::MissingConfig("SUPABASE_SERVICE_ROLE_KEY"))?;
        let store = Self::new(url, key)?;
        info!(url = %url, "Supabase store ready");
        Ok(store)
    }

    fn table_url(&self, table: &str) -> Result<Url, CmsError> {
        Ok(self.rest_url.join(table)?)
    }

    async fn list<T: Table>(&self) -> Result<Vec<T>, CmsError> {
        let mut url = self.table_url(T::TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", T::ORDER);
        debug!(table = T::TABLE, "list");
        let resp = self.client.get(url).send().await?;
        read_json(resp).await
    }

    async fn get<T: Table>(&self, id: i64) -> Result<Option<T>, CmsError> {
        self.fetch_one(T::TABLE, "id", &format!("eq.{id}")).await
    }

    async fn fetch_one<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        filter: &str,
    ) -> Result<Option<T>, CmsError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair(column, filter);
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, OBJECT_MEDIA_TYPE)
            .send()
            .await?;
        read_optional(resp).await
    }

    /// Insert with a fresh `created_at` and get the stored row back in the same call.
    async fn insert<T, B>(&self, table: &str, row: &B) -> Result<T, CmsError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("select", "*");
        let body = Stamped {
            row,
            created_at: Utc::now(),
        };
        debug!(table, "insert");
        let resp = self
            .client
            .post(url)
            .header(ACCEPT, OBJECT_MEDIA_TYPE)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        read_json(resp).await
    }

    /// PATCH only the serialized fields. An empty projection skips the write.
    async fn update<T, B>(&self, id: i64, patch: &B, is_empty: bool) -> Result<T, CmsError>
    where
        T: Table,
        B: Serialize + Sync,
    {
        if is_empty {
            return self.get::<T>(id).await?.ok_or(CmsError::RowMissing {
                table: T::TABLE,
                id,
            });
        }

        let mut url = self.table_url(T::TABLE)?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("select", "*");
        debug!(table = T::TABLE, id, "update");
        let resp = self
            .client
            .patch(url)
            .header(ACCEPT, OBJECT_MEDIA_TYPE)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        read_optional(resp).await?.ok_or(CmsError::RowMissing {
            table: T::TABLE,
            id,
        })
    }

    async fn delete<T: Table>(&self, id: i64) -> Result<(), CmsError> {
        let mut url = self.table_url(T::TABLE)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        debug!(table = T::TABLE, id, "delete");
        let resp = self.client.delete(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        Err(read_error(resp).await?.into_error(status))
    }
}

/// HTTP client carrying the `apikey` and bearer headers Supabase expects on
/// every call. Shared by the REST and storage adapters.
pub(crate) fn authorized_client(api_key: &str) -> Result<reqwest::Client, CmsError> {
    let mut headers = HeaderMap::new();
    let mut apikey = HeaderValue::from_str(api_key)
        .map_err(|_| CmsError::InvalidInput("Supabase key is not a valid header".into()))?;
    apikey.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| CmsError::InvalidInput("Supabase key is not a valid header".into()))?;
    bearer.set_sensitive(true);
    headers.insert("apikey", apikey);
    headers.insert(AUTHORIZATION, bearer);

    Ok(reqwest::Client::builder()
        .user_agent(concat!("clinic-cms/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()?)
}

#[async_trait]
impl ContentStore for SupabaseStore {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Supabase
    }

    async fn list_banners(&self) -> Result<Vec<Banner>, CmsError> {
        self.list().await
    }

    async fn get_banner(&self, id: i64) -> Result<Option<Banner>, CmsError> {
        self.get(id).await
    }

    async fn create_banner(&self, data: NewBanner) -> Result<Banner, CmsError> {
        self.insert(Banner::TABLE, &data).await
    }

    async fn update_banner(&self, id: i64, data: BannerUpdate) -> Result<Banner, CmsError> {
        self.update(id, &data, data.is_empty()).await
    }

    async fn delete_banner(&self, id: i64) -> Result<(), CmsError> {
        self.delete::<Banner>(id).await
    }

    async fn list_posts(&self) -> Result<Vec<Post>, CmsError> {
        self.list().await
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, CmsError> {
        self.get(id).await
    }

    async fn create_post(&self, data: NewPost) -> Result<Post, CmsError> {
        self.insert(Post::TABLE, &data).await
    }

    async fn update_post(&self, id: i64, data: PostUpdate) -> Result<Post, CmsError> {
        self.update(id, &data, data.is_empty()).await
    }

    async fn delete_post(&self, id: i64) -> Result<(), CmsError> {
        self.delete::<Post>(id).await
    }

    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, CmsError> {
        self.list().await
    }

    async fn get_testimonial(&self, id: i64) -> Result<Option<Testimonial>, CmsError> {
        self.get(id).await
    }

    async fn create_testimonial(&self, data: NewTestimonial) -> Result<Testimonial, CmsError> {
        self.insert(Testimonial::TABLE, &data).await
    }

    async fn update_testimonial(
        &self,
        id: i64,
        data: TestimonialUpdate,
    ) -> Result<Testimonial, CmsError> {
        self.update(id, &data, data.is_empty()).await
    }

    async fn delete_testimonial(&self, id: i64) -> Result<(), CmsError> {
        self.delete::<Testimonial>(id).await
    }

    async fn list_history_items(&self) -> Result<Vec<HistoryItem>, CmsError> {
        self.list().await
    }

    async fn get_history_item(&self, id: i64) -> Result<Option<HistoryItem>, CmsError> {
        self.get(id).await
    }

    async fn create_history_item(&self, data: NewHistoryItem) -> Result<HistoryItem, CmsError> {
        self.insert(HistoryItem::TABLE, &data).await
    }

    async fn update_history_item(
        &self,
        id: i64,
        data: HistoryItemUpdate,
    ) -> Result<HistoryItem, CmsError> {
        self.update(id, &data, data.is_empty()).await
    }

    async fn delete_history_item(&self, id: i64) -> Result<(), CmsError> {
        self.delete::<HistoryItem>(id).await
    }

    async fn list_contact_cards(&self) -> Result<Vec<ContactCard>, CmsError> {
        self.list().await
    }

    async fn get_contact_card(&self, id: i64) -> Result<Option<ContactCard>, CmsError> {
        self.get(id).await
    }

    async fn create_contact_card(&self, data: NewContactCard) -> Result<ContactCard, CmsError> {
        self.insert(ContactCard::TABLE, &data).await
    }

    async fn update_contact_card(
        &self,
        id: i64,
        data: ContactCardUpdate,
    ) -> Result<ContactCard, CmsError> {
        self.update(id, &data, data.is_empty()).await
    }

    async fn delete_contact_card(&self, id: i64) -> Result<(), CmsError> {
        self.delete::<ContactCard>(id).await
    }

    async fn get_admin_user(&self, username: &str) -> Result<Option<AdminUser>, CmsError> {
        self.fetch_one("admin_users", "username", &format!("eq.{username}"))
            .await
    }

    async fn create_admin_user(&self, data: NewAdminUser) -> Result<AdminUser, CmsError> {
        self.insert("admin_users", &data).await
    }
}

/// A PostgREST resource and the `order` clause its listing uses.
trait Table: DeserializeOwned + Send {
    const TABLE: &'static str;
    const ORDER: &'static str;
}

impl Table for Banner {
    const TABLE: &'static str = "banners";
    const ORDER: &'static str = "order_index.asc,id.asc";
}

impl Table for Post {
    const TABLE: &'static str = "posts";
    const ORDER: &'static str = "created_at.desc,id.desc";
}

impl Table for Testimonial {
    const TABLE: &'static str = "testimonials";
    const ORDER: &'static str = "created_at.desc,id.desc";
}

impl Table for HistoryItem {
    const TABLE: &'static str = "history_items";
    const ORDER: &'static str = "order_index.asc,id.asc";
}

impl Table for ContactCard {
    const TABLE: &'static str = "contact_cards";
    const ORDER: &'static str = "order_index.asc,id.asc";
}

#[derive(Serialize)]
struct Stamped<'a, B> {
    #[serde(flatten)]
    row: &'a B,
    created_at: DateTime<Utc>,
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, CmsError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }
    Err(read_error(resp).await?.into_error(status))
}

/// Like [`read_json`], but `PGRST116` (no matching row) becomes `None`.
async fn read_optional<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<Option<T>, CmsError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(Some(resp.json::<T>().await?));
    }
    let err = read_error(resp).await?;
    if err.is_no_rows() {
        return Ok(None);
    }
    Err(err.into_error(status))
}

/// Decode a non-2xx body. A body that fails to arrive is a transport error.
async fn read_error(resp: reqwest::Response) -> Result<PostgrestError, CmsError> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(|e| {
        warn!(%status, error = %e, "failed to read backend error body");
        e
    })?;
    let parsed = serde_json::from_slice::<PostgrestError>(&body);
    Ok(parsed.unwrap_or_else(|_| PostgrestError {
        code: status_code(status),
        message: String::from_utf8_lossy(&body).into_owned(),
        ..Default::default()
    }))
}

pub(crate) fn status_code(status: StatusCode) -> String {
    format!("HTTP{}", status.as_u16())
}
