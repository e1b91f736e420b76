//! Fetch one source for one product and record the observation.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use super::price_fetcher::{to_cents, FetchError, FetchResult, PriceFetcher};
use crate::models::price_snapshot::PriceSnapshot;
use crate::models::product::{FetchedMetadata, Product};
use crate::store::{PriceStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("ingestion cancelled")]
    Cancelled,
}

/// Everything a live ingestion produced: the stored row, the raw fetch result
/// and the product as written.
#[derive(Debug, Clone)]
pub struct LiveIngestion {
    pub snapshot: PriceSnapshot,
    pub fetched: FetchResult,
    pub product: Product,
}

pub struct IngestionService {
    store: Arc<dyn PriceStore>,
    fetcher: Arc<dyn PriceFetcher>,
}

impl IngestionService {
    pub fn new(store: Arc<dyn PriceStore>, fetcher: Arc<dyn PriceFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Returns `Ok(None)` when the product does not exist or no source resolves.
    pub async fn ingest(
        &self,
        product_id: Uuid,
        source_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> Result<Option<PriceSnapshot>, IngestError> {
        Ok(self
            .ingest_live(product_id, source_id, cancel)
            .await?
            .map(|live| live.snapshot))
    }

    #[instrument(skip(self, cancel))]
    pub async fn ingest_live(
        &self,
        product_id: Uuid,
        source_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> Result<Option<LiveIngestion>, IngestError> {
        let Some(product) = self.store.product(product_id).await? else {
            return Ok(None);
        };
        let Some(source) = product.select_source(source_id).cloned() else {
            return Ok(None);
        };

        let fetched = self.fetcher.fetch(&product, &source, cancel).await?;

        let snapshot = PriceSnapshot {
            id: Uuid::new_v4(),
            product_id: product.id,
            product_source_id: source.id,
            price: to_cents(fetched.price),
            currency: fetched.currency.clone(),
            collected_at: fetched.collected_at,
            raw_data_json: fetched.raw_data_json.clone(),
        };
        let metadata = FetchedMetadata {
            description: fetched.description.clone(),
            image_path_in_storage: fetched.image_path_in_storage.clone(),
            observed_at: Utc::now(),
        };

        let product = self
            .store
            .record_snapshot(&snapshot, &metadata, cancel)
            .await
            .map_err(|e| match e {
                StoreError::Cancelled => IngestError::Cancelled,
                other => IngestError::Store(other),
            })?;

        info!(
            source_id = %source.id,
            price = %snapshot.price,
            currency = %snapshot.currency,
            "Recorded price snapshot"
        );

        Ok(Some(LiveIngestion {
            snapshot,
            fetched,
            product,
        }))
    }
}
