//! Background refresh of the least recently updated products.
//!
//! ```text
//! run()
//!   ├─► cycle immediately
//!   └─► every interval (floor 60s) until cancelled
//!         └─► stale_products(max) ─► ingest(product, primary-or-first source)
//! ```
//!
//! Each cycle re-reads the candidate set from `updated_at`, so nothing is
//! checkpointed and a half-finished cycle is picked up again on the next tick.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::ingestion::{IngestError, IngestionService};
use super::price_fetcher::FetchError;
use crate::config::RefreshConfig;
use crate::store::{PriceStore, StoreError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub selected: usize,
    pub refreshed: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct PriceRefresher {
    store: Arc<dyn PriceStore>,
    ingestion: Arc<IngestionService>,
    config: RefreshConfig,
}

impl PriceRefresher {
    pub fn new(
        store: Arc<dyn PriceStore>,
        ingestion: Arc<IngestionService>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            store,
            ingestion,
            config,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Runs until `cancel` fires. Returns at once when disabled.
    pub async fn run(self, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("Price refresh disabled via configuration");
            return;
        }

        let period = self.config.interval();
        info!(
            interval_secs = period.as_secs(),
            batch_size = self.config.max_products_per_cycle,
            "Price refresh started"
        );

        self.run_logged_cycle(&cancel).await;

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.run_logged_cycle(&cancel).await,
            }
        }

        info!("Price refresh stopped");
    }

    async fn run_logged_cycle(&self, cancel: &CancellationToken) {
        match self.run_cycle(cancel).await {
            Ok(report) => info!(
                selected = report.selected,
                refreshed = report.refreshed,
                failed = report.failed,
                skipped = report.skipped,
                "Price refresh cycle finished"
            ),
            Err(e) if cancel.is_cancelled() => debug!(error = %e, "Cycle interrupted by shutdown"),
            Err(e) => error!(error = %e, "Price refresh cycle failed"),
        }
    }

    /// One pass over at most `max_products_per_cycle` products, oldest
    /// `updated_at` first. Per-product failures are logged and counted; only a
    /// failure to load the batch fails the cycle.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, StoreError> {
        let products = self
            .store
            .stale_products(self.config.max_products_per_cycle)
            .await?;

        let mut report = CycleReport {
            selected: products.len(),
            ..CycleReport::default()
        };

        if products.is_empty() {
            info!("Price refresh: no products found");
            return Ok(report);
        }

        for product in &products {
            if cancel.is_cancelled() {
                break;
            }

            let Some(source) = product.preferred_source() else {
                report.skipped += 1;
                continue;
            };

            match self.ingestion.ingest(product.id, Some(source.id), cancel).await {
                Ok(Some(_)) => report.refreshed += 1,
                Ok(None) => report.skipped += 1,
                Err(IngestError::Cancelled | IngestError::Fetch(FetchError::Cancelled)) => break,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        product_id = %product.id,
                        source_id = %source.id,
                        error = %e,
                        "Failed to refresh price"
                    );
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;

    use crate::models::product::{NewProduct, NewProductSource};
    use crate::services::testing::{product, seed_product, ScriptedFetcher};
    use crate::store::MemoryStore;

    fn config(max: i64) -> RefreshConfig {
        RefreshConfig {
            enabled: true,
            interval_secs: 60,
            max_products_per_cycle: max,
        }
    }

    fn refresher(
        store: &Arc<MemoryStore>,
        fetcher: &Arc<ScriptedFetcher>,
        config: RefreshConfig,
    ) -> PriceRefresher {
        let ingestion = Arc::new(IngestionService::new(store.clone(), fetcher.clone()));
        PriceRefresher::new(store.clone(), ingestion, config)
    }

    /// Products whose `updated_at` is `age_minutes` in the past, one primary source each.
    async fn aged_product(store: &MemoryStore, title: &str, age_minutes: i64) -> uuid::Uuid {
        let mut product = product(title);
        product.updated_at = Utc::now() - chrono::Duration::minutes(age_minutes);
        store.put_product(product.clone()).await;
        store
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
        product.id
    }

    #[tokio::test]
    async fn refreshes_oldest_first_up_to_the_batch_size() {
        let store = Arc::new(MemoryStore::new());
        let newest = aged_product(&store, "newest", 1).await;
        let oldest = aged_product(&store, "oldest", 30).await;
        let middle = aged_product(&store, "middle", 10).await;
        let fetcher = Arc::new(ScriptedFetcher::new());

        let report = refresher(&store, &fetcher, config(2))
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        let order: Vec<_> = fetcher.calls().into_iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec![oldest, middle]);
        assert_eq!(report.selected, 2);
        assert_eq!(report.refreshed, 2);
        assert!(store.snapshots(newest, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failing_product_does_not_stop_the_cycle() {
        let store = Arc::new(MemoryStore::new());
        let a = aged_product(&store, "a", 30).await;
        let b = aged_product(&store, "b", 20).await;
        let c = aged_product(&store, "c", 10).await;
        let fetcher = Arc::new(ScriptedFetcher::failing_for(b));

        let report = refresher(&store, &fetcher, config(10))
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.refreshed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.snapshots(a, 10).await.unwrap().len(), 1);
        assert!(store.snapshots(b, 10).await.unwrap().is_empty());
        assert_eq!(store.snapshots(c, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn products_without_sources_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_product(NewProduct {
                title: "No sources".to_string(),
                url: "https://example.com/none".to_string(),
                description: None,
                image_path_in_storage: None,
            })
            .await
            .unwrap();
        seed_product(&store, "With source").await;
        let fetcher = Arc::new(ScriptedFetcher::new());

        let report = refresher(&store, &fetcher, config(10))
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.refreshed, 1);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn refreshed_products_move_to_the_back_of_the_queue() {
        let store = Arc::new(MemoryStore::new());
        let first = aged_product(&store, "first", 30).await;
        let second = aged_product(&store, "second", 20).await;
        let fetcher = Arc::new(ScriptedFetcher::new());
        let refresher = refresher(&store, &fetcher, config(1));
        let cancel = CancellationToken::new();

        refresher.run_cycle(&cancel).await.unwrap();
        refresher.run_cycle(&cancel).await.unwrap();

        let order: Vec<_> = fetcher.calls().into_iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec![first, second]);
    }

    #[tokio::test]
    async fn empty_catalog_is_a_quiet_cycle() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new());

        let report = refresher(&store, &fetcher, config(10))
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report, CycleReport::default());
    }

    #[tokio::test]
    async fn disabled_refresher_returns_immediately() {
        let store = Arc::new(MemoryStore::new());
        seed_product(&store, "Kindle").await;
        let fetcher = Arc::new(ScriptedFetcher::new());
        let config = RefreshConfig {
            enabled: false,
            ..config(10)
        };

        refresher(&store, &fetcher, config)
            .run(CancellationToken::new())
            .await;

        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_on_every_tick_until_cancelled() {
        let store = Arc::new(MemoryStore::new());
        seed_product(&store, "Kindle").await;
        let fetcher = Arc::new(ScriptedFetcher::new());
        let cancel = CancellationToken::new();
        let handle = refresher(&store, &fetcher, config(10)).spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fetcher.calls().len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fetcher.calls().len(), 2);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(store.snapshot_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn short_intervals_are_floored() {
        let store = Arc::new(MemoryStore::new());
        seed_product(&store, "Kindle").await;
        let fetcher = Arc::new(ScriptedFetcher::new());
        let cancel = CancellationToken::new();
        let config = RefreshConfig {
            interval_secs: 1,
            ..config(10)
        };
        let handle = refresher(&store, &fetcher, config).spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fetcher.calls().len(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }
}
