// src/dtos/product.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dtos::price::PriceSnapshotResponse;
use crate::models::product::{NewProduct, NewProductSource, Product, ProductSource};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image_path_in_storage: Option<String>,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> NewProduct {
        NewProduct {
            title: self.title.trim().to_string(),
            url: self.url.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            image_path_in_storage: self.image_path_in_storage.filter(|i| !i.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSourceRequest {
    pub store: String,
    pub external_id: Option<String>,
    pub source_url: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

impl CreateSourceRequest {
    pub fn into_new_source(self) -> NewProductSource {
        let non_blank = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        NewProductSource {
            store: self.store.trim().to_string(),
            external_id: non_blank(self.external_id),
            source_url: non_blank(self.source_url),
            is_primary: self.is_primary,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub store: String,
    pub external_id: Option<String>,
    pub source_url: Option<String>,
    pub is_primary: bool,
}

impl From<ProductSource> for SourceResponse {
    fn from(source: ProductSource) -> Self {
        Self {
            id: source.id,
            product_id: source.product_id,
            store: source.store,
            external_id: source.external_id,
            source_url: source.source_url,
            is_primary: source.is_primary,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image_path_in_storage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sources: Vec<SourceResponse>,
}

// Convert from Model to Response DTO
impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            title: product.title,
            url: product.url,
            description: product.description,
            image_path_in_storage: product.image_path_in_storage,
            created_at: product.created_at,
            updated_at: product.updated_at,
            sources: product.sources.into_iter().map(SourceResponse::from).collect(),
        }
    }
}

/// Single-product view: the product plus its most recent prices.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub prices: Vec<PriceSnapshotResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub items: Vec<ProductResponse>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResponse {
    pub product_id: Uuid,
    pub source_id: Uuid,
    pub product: ProductResponse,
}

#[derive(Debug, Serialize)]
pub struct SeedSamplesResponse {
    pub count: usize,
    pub items: Vec<ProductResponse>,
}
