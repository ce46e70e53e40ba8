use crate::db::ContentStore;
use crate::db::factory::DatabaseBackend;
use crate::db::models::*;
use crate::db::schema::SQLITE_INIT;
use crate::error::CmsError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use tracing::info;

pub type SqlitePool = Pool<Sqlite>;

/// Embedded adapter: one file-backed SQLite database shared through an sqlx pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating when missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, CmsError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        info!(database_url = %database_url, "SQLite store ready");
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), CmsError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn list<T: Record>(&self) -> Result<Vec<T>, CmsError> {
        let sql = format!("SELECT * FROM {} ORDER BY {}", T::TABLE, T::ORDER_BY);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| T::from_row(row).map_err(CmsError::from))
            .collect()
    }

    async fn get<T: Record>(&self, id: i64) -> Result<Option<T>, CmsError> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", T::TABLE);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(T::from_row).transpose()?)
    }

    /// Insert `columns` plus a fresh `created_at`, then read the row back.
    async fn insert<T: Record>(&self, columns: Vec<Column>) -> Result<T, CmsError> {
        let now = Utc::now().timestamp_millis();

        let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (", T::TABLE));
        let mut names = qb.separated(", ");
        for (name, _) in &columns {
            names.push(*name);
        }
        names.push("created_at");

        qb.push(") VALUES (");
        let mut values = qb.separated(", ");
        for (_, value) in columns {
            match value {
                Value::Text(s) => values.push_bind(s),
                Value::Integer(i) => values.push_bind(i),
            };
        }
        values.push_bind(now);
        qb.push(")");

        let id = qb.build().execute(&self.pool).await?.last_insert_rowid();
        self.get::<T>(id)
            .await?
            .ok_or(CmsError::RowMissing { table: T::TABLE, id })
    }

    /// Write only the supplied columns. No columns means no statement at all.
    async fn update<T: Record>(&self, id: i64, columns: Vec<Column>) -> Result<T, CmsError> {
        if !columns.is_empty() {
            let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", T::TABLE));
            let mut set = qb.separated(", ");
            for (name, value) in columns {
                set.push(format!("{name} = "));
                match value {
                    Value::Text(s) => set.push_bind_unseparated(s),
                    Value::Integer(i) => set.push_bind_unseparated(i),
                };
            }
            qb.push(" WHERE id = ").push_bind(id);
            qb.build().execute(&self.pool).await?;
        }

        self.get::<T>(id)
            .await?
            .ok_or(CmsError::RowMissing { table: T::TABLE, id })
    }

    async fn delete<T: Record>(&self, id: i64) -> Result<(), CmsError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn list_banners(&self) -> Result<Vec<Banner>, CmsError> {
        self.list().await
    }

    async fn get_banner(&self, id: i64) -> Result<Option<Banner>, CmsError> {
        self.get(id).await
    }

    async fn create_banner(&self, data: NewBanner) -> Result<Banner, CmsError> {
        self.insert(data.into_columns()).await
    }

    async fn update_banner(&self, id: i64, data: BannerUpdate) -> Result<Banner, CmsError> {
        self.update(id, data.into_columns()).await
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
        self.insert(data.into_columns()).await
    }

    async fn update_post(&self, id: i64, data: PostUpdate) -> Result<Post, CmsError> {
        self.update(id, data.into_columns()).await
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
        self.insert(data.into_columns()).await
    }

    async fn update_testimonial(
        &self,
        id: i64,
        data: TestimonialUpdate,
    ) -> Result<Testimonial, CmsError> {
        self.update(id, data.into_columns()).await
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
        self.insert(data.into_columns()).await
    }

    async fn update_history_item(
        &self,
        id: i64,
        data: HistoryItemUpdate,
    ) -> Result<HistoryItem, CmsError> {
        self.update(id, data.into_columns()).await
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
        self.insert(data.into_columns()).await
    }

    async fn update_contact_card(
        &self,
        id: i64,
        data: ContactCardUpdate,
    ) -> Result<ContactCard, CmsError> {
        self.update(id, data.into_columns()).await
    }

    async fn delete_contact_card(&self, id: i64) -> Result<(), CmsError> {
        self.delete::<ContactCard>(id).await
    }

    async fn get_admin_user(&self, username: &str) -> Result<Option<AdminUser>, CmsError> {
        let row = sqlx::query("SELECT * FROM admin_users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(AdminUser::from_row).transpose()?)
    }

    async fn create_admin_user(&self, data: NewAdminUser) -> Result<AdminUser, CmsError> {
        self.insert(data.into_columns()).await
    }
}

/// A table-backed row type.
trait Record: Sized + Send {
    const TABLE: &'static str;
    const ORDER_BY: &'static str;

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

enum Value {
    Text(Option<String>),
    Integer(i64),
}

type Column = (&'static str, Value);

/// Projection to the `(column, value)` pairs actually written.
trait IntoColumns {
    fn into_columns(self) -> Vec<Column>;
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| sqlx::Error::Decode(format!("created_at {ms} out of range").into()))
}

fn decode_kind(raw: String) -> Result<ContactCardKind, sqlx::Error> {
    raw.parse::<ContactCardKind>()
        .map_err(|e| sqlx::Error::Decode(e.into()))
}

impl Record for Banner {
    const TABLE: &'static str = "banners";
    const ORDER_BY: &'static str = "order_index ASC, id ASC";

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            image_url: row.try_get("image_url")?,
            order_index: row.try_get("order_index")?,
            created_at: millis_to_datetime(row.try_get("created_at")?)?,
        })
    }
}

impl Record for Post {
    const TABLE: &'static str = "posts";
    const ORDER_BY: &'static str = "created_at DESC, id DESC";

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let published: i64 = row.try_get("published")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            image_url: row.try_get("image_url")?,
            created_at: millis_to_datetime(row.try_get("created_at")?)?,
            published: published != 0,
        })
    }
}

impl Record for Testimonial {
    const TABLE: &'static str = "testimonials";
    const ORDER_BY: &'static str = "created_at DESC, id DESC";

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let published: i64 = row.try_get("published")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            content: row.try_get("content")?,
            role: row.try_get("role")?,
            created_at: millis_to_datetime(row.try_get("created_at")?)?,
            published: published != 0,
        })
    }
}

impl Record for HistoryItem {
    const TABLE: &'static str = "history_items";
    const ORDER_BY: &'static str = "order_index ASC, id ASC";

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            image_url: row.try_get("image_url")?,
            order_index: row.try_get("order_index")?,
            created_at: millis_to_datetime(row.try_get("created_at")?)?,
        })
    }
}

impl Record for ContactCard {
    const TABLE: &'static str = "contact_cards";
    const ORDER_BY: &'static str = "order_index ASC, id ASC";

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            kind: decode_kind(row.try_get("type")?)?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            image_url: row.try_get("image_url")?,
            order_index: row.try_get("order_index")?,
            created_at: millis_to_datetime(row.try_get("created_at")?)?,
        })
    }
}

impl Record for AdminUser {
    const TABLE: &'static str = "admin_users";
    const ORDER_BY: &'static str = "id ASC";

    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            created_at: millis_to_datetime(row.try_get("created_at")?)?,
        })
    }
}

impl IntoColumns for NewBanner {
    fn into_columns(self) -> Vec<Column> {
        vec![
            ("image_url", Value::Text(Some(self.image_url))),
            ("order_index", Value::Integer(self.order_index)),
        ]
    }
}

impl IntoColumns for NewPost {
    fn into_columns(self) -> Vec<Column> {
        vec![
            ("title", Value::Text(Some(self.title))),
            ("content", Value::Text(Some(self.content))),
            ("image_url", Value::Text(self.image_url)),
            ("published", Value::Integer(i64::from(self.published))),
        ]
    }
}

impl IntoColumns for NewTestimonial {
    fn into_columns(self) -> Vec<Column> {
        vec![
            ("name", Value::Text(Some(self.name))),
            ("content", Value::Text(Some(self.content))),
            ("role", Value::Text(self.role)),
            ("published", Value::Integer(i64::from(self.published))),
        ]
    }
}

impl IntoColumns for NewHistoryItem {
    fn into_columns(self) -> Vec<Column> {
        vec![
            ("title", Value::Text(Some(self.title))),
            ("content", Value::Text(Some(self.content))),
            ("image_url", Value::Text(self.image_url)),
            ("order_index", Value::Integer(self.order_index)),
        ]
    }
}

impl IntoColumns for NewContactCard {
    fn into_columns(self) -> Vec<Column> {
        vec![
            ("type", Value::Text(Some(self.kind.as_str().to_string()))),
            ("title", Value::Text(self.title)),
            ("content", Value::Text(self.content)),
            ("image_url", Value::Text(self.image_url)),
            ("order_index", Value::Integer(self.order_index)),
        ]
    }
}

impl IntoColumns for NewAdminUser {
    fn into_columns(self) -> Vec<Column> {
        vec![
            ("username", Value::Text(Some(self.username))),
            ("password_hash", Value::Text(Some(self.password_hash))),
        ]
    }
}

impl IntoColumns for BannerUpdate {
    fn into_columns(self) -> Vec<Column> {
        let mut cols = Vec::new();
        if let Some(v) = self.image_url {
            cols.push(("image_url", Value::Text(Some(v))));
        }
        if let Some(v) = self.order_index {
            cols.push(("order_index", Value::Integer(v)));
        }
        cols
    }
}

impl IntoColumns for PostUpdate {
    fn into_columns(self) -> Vec<Column> {
        let mut cols = Vec::new();
        if let Some(v) = self.title {
            cols.push(("title", Value::Text(Some(v))));
        }
        if let Some(v) = self.content {
            cols.push(("content", Value::Text(Some(v))));
        }
        if let Some(v) = self.image_url {
            cols.push(("image_url", Value::Text(v)));
        }
        if let Some(v) = self.published {
            cols.push(("published", Value::Integer(i64::from(v))));
        }
        cols
    }
}

impl IntoColumns for TestimonialUpdate {
    fn into_columns(self) -> Vec<Column> {
        let mut cols = Vec::new();
        if let Some(v) = self.name {
            cols.push(("name", Value::Text(Some(v))));
        }
        if let Some(v) = self.content {
            cols.push(("content", Value::Text(Some(v))));
        }
        if let Some(v) = self.role {
            cols.push(("role", Value::Text(v)));
        }
        if let Some(v) = self.published {
            cols.push(("published", Value::Integer(i64::from(v))));
        }
        cols
    }
}

impl IntoColumns for HistoryItemUpdate {
    fn into_columns(self) -> Vec<Column> {
        let mut cols = Vec::new();
        if let Some(v) = self.title {
            cols.push(("title", Value::Text(Some(v))));
        }
        if let Some(v) = self.content {
            cols.push(("content", Value::Text(Some(v))));
        }
        if let Some(v) = self.image_url {
            cols.push(("image_url", Value::Text(v)));
        }
        if let Some(v) = self.order_index {
            cols.push(("order_index", Value::Integer(v)));
        }
        cols
    }
}

impl IntoColumns for ContactCardUpdate {
    fn into_columns(self) -> Vec<Column> {
        let mut cols = Vec::new();
        if let Some(v) = self.kind {
            cols.push(("type", Value::Text(Some(v.as_str().to_string()))));
        }
        if let Some(v) = self.title {
            cols.push(("title", Value::Text(v)));
        }
        if let Some(v) = self.content {
            cols.push(("content", Value::Text(v)));
        }
        if let Some(v) = self.image_url {
            cols.push(("image_url", Value::Text(v)));
        }
        if let Some(v) = self.order_index {
            cols.push(("order_index", Value::Integer(v)));
        }
        cols
    }
}
