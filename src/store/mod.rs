//! Persistence boundary for products, sources and price snapshots.
//!
//! `PgStore` is the production backend; `MemoryStore` backs tests and
//! database-less local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::price_snapshot::PriceSnapshot;
use crate::models::product::{
    FetchedMetadata, NewProduct, NewProductSource, Product, ProductSource,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Conflict(String),
    /// A referenced product or source does not exist (or was just deleted).
    #[error("{0}")]
    NotFound(String),
    #[error("write cancelled")]
    Cancelled,
}

/// One page of search results plus the unpaged match count.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: i64,
}

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Most recently updated products first, sources loaded.
    async fn recent_products(&self, limit: i64) -> Result<Vec<Product>, StoreError>;

    /// Case-insensitive substring match on title or url.
    async fn search_products(
        &self,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<ProductPage, StoreError>;

    /// Product with its sources, or `None`.
    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    async fn product_by_url(&self, url: &str) -> Result<Option<Product>, StoreError>;

    /// Fails with `StoreError::Conflict` when the url is already registered.
    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError>;

    /// Fails with `StoreError::NotFound` when the product does not exist.
    async fn insert_source(
        &self,
        product_id: Uuid,
        new: NewProductSource,
    ) -> Result<ProductSource, StoreError>;

    /// Newest first by `collected_at`.
    async fn snapshots(&self, product_id: Uuid, limit: i64)
        -> Result<Vec<PriceSnapshot>, StoreError>;

    /// Least recently refreshed products first, sources loaded.
    async fn stale_products(&self, limit: i64) -> Result<Vec<Product>, StoreError>;

    /// Appends `snapshot` and back-fills the product from `fetched` as one
    /// unit of work, returning the product as written. The back-fill is
    /// evaluated against the stored row, so concurrent writers never
    /// overwrite a value another one already filled in.
    ///
    /// Nothing is written once `cancel` has fired.
    async fn record_snapshot(
        &self,
        snapshot: &PriceSnapshot,
        fetched: &FetchedMetadata,
        cancel: &CancellationToken,
    ) -> Result<Product, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
