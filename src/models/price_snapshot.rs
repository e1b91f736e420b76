use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// One immutable price observation. Rows are only ever inserted.
#[derive(Debug, Clone, FromRow)]
pub struct PriceSnapshot {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_source_id: Uuid,
    pub price: Decimal,
    pub currency: String,
    pub collected_at: DateTime<Utc>,
    pub raw_data_json: Option<String>,
}
