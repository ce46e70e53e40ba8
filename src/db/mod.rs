//! Database module: the storage contract and its backends.
//!
//! Layout:
//! - `models.rs`: row types and their insert/update projections
//! - `schema.rs`: SQL DDL for the embedded SQLite store
//! - `sqlite.rs`: embedded adapter over an sqlx SQLite pool
//! - `supabase.rs`: hosted adapter over the PostgREST HTTP API
//! - `factory.rs`: backend selection from configuration

pub mod factory;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod supabase;

use crate::error::CmsError;
use async_trait::async_trait;

pub use factory::{DatabaseBackend, open_store};
pub use models::{
    AdminUser, Banner, BannerUpdate, ContactCard, ContactCardKind, ContactCardUpdate, HistoryItem,
    HistoryItemUpdate, NewAdminUser, NewBanner, NewContactCard, NewHistoryItem, NewPost,
    NewTestimonial, Post, PostUpdate, Testimonial, TestimonialUpdate,
};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, SqliteStore};
pub use supabase::SupabaseStore;

/// Data-access contract every storage backend satisfies.
///
/// Lookups return `Ok(None)` for missing rows. Deletes are idempotent.
/// Updates touch only the fields present in the projection and fail with
/// [`CmsError::RowMissing`] when the target row does not exist.
///
/// Listing order: banners, history items and contact cards by `order_index`
/// ascending, ties by `id` ascending; posts and testimonials by `created_at`
/// descending, ties by `id` descending (newest insert first).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> DatabaseBackend;

    async fn list_banners(&self) -> Result<Vec<Banner>, CmsError>;
    async fn get_banner(&self, id: i64) -> Result<Option<Banner>, CmsError>;
    async fn create_banner(&self, data: NewBanner) -> Result<Banner, CmsError>;
    async fn update_banner(&self, id: i64, data: BannerUpdate) -> Result<Banner, CmsError>;
    async fn delete_banner(&self, id: i64) -> Result<(), CmsError>;

    async fn list_posts(&self) -> Result<Vec<Post>, CmsError>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>, CmsError>;
    async fn create_post(&self, data: NewPost) -> Result<Post, CmsError>;
    async fn update_post(&self, id: i64, data: PostUpdate) -> Result<Post, CmsError>;
    async fn delete_post(&self, id: i64) -> Result<(), CmsError>;

    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, CmsError>;
    async fn get_testimonial(&self, id: i64) -> Result<Option<Testimonial>, CmsError>;
    async fn create_testimonial(&self, data: NewTestimonial) -> Result<Testimonial, CmsError>;
    async fn update_testimonial(
        &self,
        id: i64,
        data: TestimonialUpdate,
    ) -> Result<Testimonial, CmsError>;
    async fn delete_testimonial(&self, id: i64) -> Result<(), CmsError>;

    async fn list_history_items(&self) -> Result<Vec<HistoryItem>, CmsError>;
    async fn get_history_item(&self, id: i64) -> Result<Option<HistoryItem>, CmsError>;
    async fn create_history_item(&self, data: NewHistoryItem) -> Result<HistoryItem, CmsError>;
    async fn update_history_item(
        &self,
        id: i64,
        data: HistoryItemUpdate,
    ) -> Result<HistoryItem, CmsError>;
    async fn delete_history_item(&self, id: i64) -> Result<(), CmsError>;

    async fn list_contact_cards(&self) -> Result<Vec<ContactCard>, CmsError>;
    async fn get_contact_card(&self, id: i64) -> Result<Option<ContactCard>, CmsError>;
    async fn create_contact_card(&self, data: NewContactCard) -> Result<ContactCard, CmsError>;
    async fn update_contact_card(
        &self,
        id: i64,
        data: ContactCardUpdate,
    ) -> Result<ContactCard, CmsError>;
    async fn delete_contact_card(&self, id: i64) -> Result<(), CmsError>;

    async fn get_admin_user(&self, username: &str) -> Result<Option<AdminUser>, CmsError>;
    async fn create_admin_user(&self, data: NewAdminUser) -> Result<AdminUser, CmsError>;
}
