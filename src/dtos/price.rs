// src/dtos/price.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::dtos::product::ProductResponse;
use crate::models::price_snapshot::PriceSnapshot;
use crate::services::LiveIngestion;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshotResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_source_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub currency: String,
    pub collected_at: DateTime<Utc>,
    pub raw_data_json: Option<String>,
}

impl From<PriceSnapshot> for PriceSnapshotResponse {
    fn from(snapshot: PriceSnapshot) -> Self {
        Self {
            id: snapshot.id,
            product_id: snapshot.product_id,
            product_source_id: snapshot.product_source_id,
            price: snapshot.price,
            currency: snapshot.currency,
            collected_at: snapshot.collected_at,
            raw_data_json: snapshot.raw_data_json,
        }
    }
}

/// What a live fetch saw, next to what was stored.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchLiveResponse {
    pub snapshot: PriceSnapshotResponse,
    pub description: Option<String>,
    pub image_path_in_storage: Option<String>,
    pub raw_data_json: Option<String>,
    pub product: ProductResponse,
}

impl From<LiveIngestion> for FetchLiveResponse {
    fn from(live: LiveIngestion) -> Self {
        Self {
            snapshot: live.snapshot.into(),
            description: live.fetched.description,
            image_path_in_storage: live.fetched.image_path_in_storage,
            raw_data_json: live.fetched.raw_data_json,
            product: live.product.into(),
        }
    }
}
