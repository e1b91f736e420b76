use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{PriceStore, ProductPage, StoreError};
use crate::models::price_snapshot::PriceSnapshot;
use crate::models::product::{
    FetchedMetadata, NewProduct, NewProductSource, Product, ProductSource,
};

#[derive(Default)]
struct Tables {
    products: Vec<Product>,
    sources: Vec<ProductSource>,
    snapshots: Vec<PriceSnapshot>,
}

impl Tables {
    fn with_sources(&self, product: &Product) -> Product {
        let mut product = product.clone();
        product.sources = self
            .sources
            .iter()
            .filter(|s| s.product_id == product.id)
            .cloned()
            .collect();
        product
    }
}

/// Process-local store. Products are kept without their sources; sources are
/// joined on read, mirroring the relational layout.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed product row, timestamps included.
    pub async fn put_product(&self, product: Product) {
        let mut tables = self.tables.write().await;
        let mut row = product;
        row.sources.clear();
        tables.products.push(row);
    }

    pub async fn snapshot_count(&self) -> usize {
        self.tables.read().await.snapshots.len()
    }
}

fn limit_to_usize(limit: i64) -> usize {
    usize::try_from(limit.max(0)).unwrap_or(usize::MAX)
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn recent_products(&self, limit: i64) -> Result<Vec<Product>, StoreError> {
        let tables = self.tables.read().await;
        let mut products: Vec<&Product> = tables.products.iter().collect();
        products.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(products
            .into_iter()
            .take(limit_to_usize(limit))
            .map(|p| tables.with_sources(p))
            .collect())
    }

    async fn search_products(
        &self,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<ProductPage, StoreError> {
        let needle = query.trim().to_lowercase();
        let tables = self.tables.read().await;
        let mut matches: Vec<&Product> = tables
            .products
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle) || p.url.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let total = i64::try_from(matches.len()).unwrap_or(i64::MAX);
        let items = matches
            .into_iter()
            .skip(limit_to_usize(offset))
            .take(limit_to_usize(limit))
            .map(|p| tables.with_sources(p))
            .collect();
        Ok(ProductPage { items, total })
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| tables.with_sources(p)))
    }

    async fn product_by_url(&self, url: &str) -> Result<Option<Product>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .find(|p| p.url == url)
            .map(|p| tables.with_sources(p)))
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.products.iter().any(|p| p.url == new.url) {
            return Err(StoreError::Conflict("Product url already registered".to_string()));
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            title: new.title,
            url: new.url,
            description: new.description,
            image_path_in_storage: new.image_path_in_storage,
            created_at: now,
            updated_at: now,
            sources: Vec::new(),
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn insert_source(
        &self,
        product_id: Uuid,
        new: NewProductSource,
    ) -> Result<ProductSource, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.products.iter().any(|p| p.id == product_id) {
            return Err(StoreError::NotFound(format!("product {product_id} does not exist")));
        }

        let source = ProductSource {
            id: Uuid::new_v4(),
            product_id,
            store: new.store,
            external_id: new.external_id,
            source_url: new.source_url,
            is_primary: new.is_primary,
        };
        tables.sources.push(source.clone());
        Ok(source)
    }

    async fn snapshots(
        &self,
        product_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PriceSnapshot>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PriceSnapshot> = tables
            .snapshots
            .iter()
            .filter(|s| s.product_id == product_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.collected_at.cmp(&a.collected_at));
        rows.truncate(limit_to_usize(limit));
        Ok(rows)
    }

    async fn stale_products(&self, limit: i64) -> Result<Vec<Product>, StoreError> {
        let tables = self.tables.read().await;
        let mut products: Vec<&Product> = tables.products.iter().collect();
        products.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(products
            .into_iter()
            .take(limit_to_usize(limit))
            .map(|p| tables.with_sources(p))
            .collect())
    }

    async fn record_snapshot(
        &self,
        snapshot: &PriceSnapshot,
        fetched: &FetchedMetadata,
        cancel: &CancellationToken,
    ) -> Result<Product, StoreError> {
        let mut tables = self.tables.write().await;
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let source_known = tables
            .sources
            .iter()
            .any(|s| s.id == snapshot.product_source_id && s.product_id == snapshot.product_id);
        if !source_known {
            return Err(StoreError::NotFound(format!(
                "source {} no longer exists",
                snapshot.product_source_id
            )));
        }
        let Some(row) = tables.products.iter_mut().find(|p| p.id == snapshot.product_id) else {
            return Err(StoreError::NotFound(format!(
                "product {} no longer exists",
                snapshot.product_id
            )));
        };

        row.apply_fetched(fetched);
        let written = row.clone();
        tables.snapshots.push(snapshot.clone());
        Ok(tables.with_sources(&written))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
