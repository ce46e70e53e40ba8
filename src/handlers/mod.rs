//! JSON handlers, one module per entity. Reads are public; every write
//! requires an admin session.

pub mod auth;
pub mod banners;
pub mod contact;
pub mod history;
pub mod posts;
pub mod testimonials;
pub mod upload;

use serde::Deserialize;

use crate::error::CmsError;

/// `?id=N` on GET (single row) and DELETE.
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<i64>,
}

impl IdQuery {
    pub fn require_id(&self) -> Result<i64, CmsError> {
        self.id
            .ok_or_else(|| CmsError::InvalidInput("missing `id` query parameter".to_string()))
    }
}

/// Listing query for publishable entities: `?id=N` or `?published=true|false`.
#[derive(Debug, Default, Deserialize)]
pub struct PublishedQuery {
    pub id: Option<i64>,
    pub published: Option<bool>,
}

/// PUT body: the row id alongside the fields to change.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest<T> {
    pub id: i64,
    #[serde(flatten)]
    pub fields: T,
}
