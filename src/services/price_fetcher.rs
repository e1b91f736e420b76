//! The single capability the ingestion pipeline needs from the outside world:
//! "what does this source charge right now?"

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::product::{Product, ProductSource};
use crate::services::price_parser::ParseError;

/// Currency recorded when a page gives no recognizable symbol.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Rounds half away from zero to cents and pins the scale at two digits,
/// matching how a `NUMERIC(18,2)` column stores the value.
pub fn to_cents(amount: Decimal) -> Decimal {
    let mut cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    cents
}

/// One observation returned by a fetcher, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    /// Always carried at two fraction digits.
    pub price: Decimal,
    /// ISO 4217, upper case.
    pub currency: String,
    /// Set when the fetch completed, not when it was issued.
    pub collected_at: DateTime<Utc>,
    pub description: Option<String>,
    pub image_path_in_storage: Option<String>,
    pub raw_data_json: Option<String>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source {source_id} has no fetchable url: {reason}")]
    Configuration { source_id: uuid::Uuid, reason: String },
    #[error("request to {url} failed: {error}")]
    Transport {
        url: String,
        #[source]
        error: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("fetch cancelled")]
    Cancelled,
}

#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Observes the current price of `product` through `source`.
    ///
    /// Implementations must give up with `FetchError::Cancelled` once `cancel`
    /// fires, and must not retry on their own.
    async fn fetch(
        &self,
        product: &Product,
        source: &ProductSource,
        cancel: &CancellationToken,
    ) -> Result<FetchResult, FetchError>;
}
