//! Fixtures and scripted fetchers shared by the service tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::price_fetcher::{FetchError, FetchResult, PriceFetcher};
use super::price_parser::ParseError;
use crate::models::product::{NewProduct, NewProductSource, Product, ProductSource};
use crate::store::{MemoryStore, PriceStore};

pub fn product(title: &str) -> Product {
    Product {
        id: Uuid::new_v4(),
        title: title.to_string(),
        url: format!("https://example.com/{}", Uuid::new_v4()),
        description: None,
        image_path_in_storage: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        sources: Vec::new(),
    }
}

pub fn source(
    product: &Product,
    external_id: Option<&str>,
    source_url: Option<&str>,
    is_primary: bool,
) -> ProductSource {
    ProductSource {
        id: Uuid::new_v4(),
        product_id: product.id,
        store: "amazon".to_string(),
        external_id: external_id.map(str::to_string),
        source_url: source_url.map(str::to_string),
        is_primary,
    }
}

/// Registers a product with one primary source and returns both.
pub async fn seed_product(store: &MemoryStore, title: &str) -> (Product, ProductSource) {
    let product = store
        .insert_product(NewProduct {
            title: title.to_string(),
            url: format!("https://example.com/{}", Uuid::new_v4()),
            description: None,
            image_path_in_storage: None,
        })
        .await
        .unwrap();
    let source = store
        .insert_source(
            product.id,
            NewProductSource {
                store: "amazon".to_string(),
                external_id: Some(format!("ASIN-{title}")),
                source_url: None,
                is_primary: true,
            },
        )
        .await
        .unwrap();
    (product, source)
}

/// Fetcher with a fixed answer that records every call and fails on demand.
#[derive(Default)]
pub struct ScriptedFetcher {
    pub price: Decimal,
    pub description: Option<String>,
    pub image_path_in_storage: Option<String>,
    pub fail_for: HashSet<Uuid>,
    /// Simulated network latency before answering.
    pub delay: Option<Duration>,
    pub calls: Mutex<Vec<(Uuid, Uuid)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            price: Decimal::new(1999, 2),
            ..Self::default()
        }
    }

    pub fn failing_for(product_id: Uuid) -> Self {
        let mut fetcher = Self::new();
        fetcher.fail_for.insert(product_id);
        fetcher
    }

    /// `(product_id, source_id)` pairs in call order.
    pub fn calls(&self) -> Vec<(Uuid, Uuid)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        product: &Product,
        source: &ProductSource,
        cancel: &CancellationToken,
    ) -> Result<FetchResult, FetchError> {
        self.calls.lock().unwrap().push((product.id, source.id));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        if self.fail_for.contains(&product.id) {
            return Err(FetchError::Parse(ParseError::NoPriceFound));
        }

        Ok(FetchResult {
            price: self.price,
            currency: "USD".to_string(),
            collected_at: Utc::now(),
            description: self.description.clone(),
            image_path_in_storage: self.image_path_in_storage.clone(),
            raw_data_json: Some("{\"fixture\":true}".to_string()),
        })
    }
}
