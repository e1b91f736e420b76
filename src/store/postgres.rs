use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Error as SqlxError, PgPool, Postgres, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use uuid::Uuid;

use super::{PriceStore, ProductPage, StoreError};
use crate::models::price_snapshot::PriceSnapshot;
use crate::models::product::{
    FetchedMetadata, NewProduct, NewProductSource, Product, ProductSource,
};

const PRODUCT_COLUMNS: &str =
    "id, title, url, description, image_path_in_storage, created_at, updated_at";
const SOURCE_COLUMNS: &str = "id, product_id, store, external_id, source_url, is_primary";
const SNAPSHOT_COLUMNS: &str =
    "id, product_id, product_source_id, price, currency, collected_at, raw_data_json";

fn map_unique_violation(err: SqlxError, message: &str) -> StoreError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            StoreError::Conflict(message.to_string())
        }
        other => other.into(),
    }
}

fn map_foreign_key_violation(err: SqlxError, message: &str) -> StoreError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
            StoreError::NotFound(message.to_string())
        }
        other => other.into(),
    }
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_sources(&self, mut products: Vec<Product>) -> Result<Vec<Product>, StoreError> {
        if products.is_empty() {
            return Ok(products);
        }

        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let sources = sqlx::query_as::<_, ProductSource>(&format!(
            "SELECT {SOURCE_COLUMNS} FROM product_sources
             WHERE product_id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<Uuid, Vec<ProductSource>> = HashMap::new();
        for source in sources {
            by_product.entry(source.product_id).or_default().push(source);
        }
        for product in &mut products {
            product.sources = by_product.remove(&product.id).unwrap_or_default();
        }
        Ok(products)
    }
}

#[async_trait]
impl PriceStore for PgStore {
    async fn recent_products(&self, limit: i64) -> Result<Vec<Product>, StoreError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY updated_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_sources(products).await
    }

    async fn search_products(
        &self,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<ProductPage, StoreError> {
        let pattern = like_pattern(query.trim());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE title ILIKE $1 OR url ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE title ILIKE $1 OR url ILIKE $1
             ORDER BY updated_at DESC
             OFFSET $2 LIMIT $3"
        ))
        .bind(&pattern)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let items = self.attach_sources(items).await?;
        Ok(ProductPage { items, total })
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match product {
            Some(product) => Ok(self.attach_sources(vec![product]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn product_by_url(&self, url: &str) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE url = $1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        match product {
            Some(product) => Ok(self.attach_sources(vec![product]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (id, title, url, description, image_path_in_storage)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.url)
        .bind(&new.description)
        .bind(&new.image_path_in_storage)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Product url already registered"))
    }

    async fn insert_source(
        &self,
        product_id: Uuid,
        new: NewProductSource,
    ) -> Result<ProductSource, StoreError> {
        let source = sqlx::query_as::<_, ProductSource>(&format!(
            "INSERT INTO product_sources (id, product_id, store, external_id, source_url, is_primary)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SOURCE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(&new.store)
        .bind(&new.external_id)
        .bind(&new.source_url)
        .bind(new.is_primary)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_foreign_key_violation(e, &format!("product {product_id} does not exist"))
        })?;

        Ok(source)
    }

    async fn snapshots(
        &self,
        product_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PriceSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, PriceSnapshot>(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM price_snapshots
             WHERE product_id = $1
             ORDER BY collected_at DESC
             LIMIT $2"
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn stale_products(&self, limit: i64) -> Result<Vec<Product>, StoreError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY updated_at ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_sources(products).await
    }

    async fn record_snapshot(
        &self,
        snapshot: &PriceSnapshot,
        fetched: &FetchedMetadata,
        cancel: &CancellationToken,
    ) -> Result<Product, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let mut tx = self.pool.begin().await?;

        // dropping `tx` unfinished rolls it back
        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(product_id = %snapshot.product_id, "Snapshot write cancelled");
                return Err(StoreError::Cancelled);
            }
            written = write_snapshot(&mut tx, snapshot, fetched) => written?,
        };

        let Some(product) = written else {
            tx.rollback().await?;
            error!(product_id = %snapshot.product_id, "Product vanished while recording snapshot");
            return Err(StoreError::NotFound(format!(
                "product {} no longer exists",
                snapshot.product_id
            )));
        };

        tx.commit().await?;

        self.attach_sources(vec![product])
            .await?
            .pop()
            .ok_or_else(|| {
                StoreError::NotFound(format!("product {} no longer exists", snapshot.product_id))
            })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Inserts the snapshot, then back-fills against the locked product row.
/// `None` when the product is gone.
async fn write_snapshot(
    tx: &mut Transaction<'static, Postgres>,
    snapshot: &PriceSnapshot,
    fetched: &FetchedMetadata,
) -> Result<Option<Product>, StoreError> {
    sqlx::query(
        "INSERT INTO price_snapshots
            (id, product_id, product_source_id, price, currency, collected_at, raw_data_json)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(snapshot.id)
    .bind(snapshot.product_id)
    .bind(snapshot.product_source_id)
    .bind(snapshot.price)
    .bind(&snapshot.currency)
    .bind(snapshot.collected_at)
    .bind(&snapshot.raw_data_json)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_foreign_key_violation(e, "product or source no longer exists"))?;

    let product = sqlx::query_as::<_, Product>(&format!(
        "UPDATE products
         SET description = COALESCE(NULLIF(description, ''), $1),
             image_path_in_storage = COALESCE(NULLIF(image_path_in_storage, ''), $2),
             updated_at = GREATEST(updated_at + INTERVAL '1 microsecond', $3)
         WHERE id = $4
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(fetched.description.as_deref().filter(|v| !v.is_empty()))
    .bind(fetched.image_path_in_storage.as_deref().filter(|v| !v.is_empty()))
    .bind(fetched.observed_at)
    .bind(snapshot.product_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("kindle"), "%kindle%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
