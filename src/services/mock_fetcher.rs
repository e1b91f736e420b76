use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use super::price_fetcher::{FetchError, FetchResult, PriceFetcher, DEFAULT_CURRENCY};
use crate::models::product::{Product, ProductSource};

const MOCK_DESCRIPTION: &str = "Mock description for testing";

/// Offline fetcher whose price depends only on the source identifier, so
/// repeated calls for the same source always agree.
#[derive(Debug, Clone, Default)]
pub struct MockPriceFetcher;

impl MockPriceFetcher {
    pub fn new() -> Self {
        Self
    }

    /// `10 + (len(identifier) mod 50)` where the identifier is the external id,
    /// else the source url, else the product title.
    pub fn price_for(product: &Product, source: &ProductSource) -> Decimal {
        let identifier = source
            .external_id
            .as_deref()
            .or(source.source_url.as_deref())
            .unwrap_or(&product.title);
        let seed = identifier.chars().count() as i64;
        Decimal::new((10 + seed % 50) * 100, 2)
    }
}

#[async_trait]
impl PriceFetcher for MockPriceFetcher {
    async fn fetch(
        &self,
        product: &Product,
        source: &ProductSource,
        cancel: &CancellationToken,
    ) -> Result<FetchResult, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        Ok(FetchResult {
            price: Self::price_for(product, source),
            currency: DEFAULT_CURRENCY.to_string(),
            collected_at: Utc::now(),
            description: Some(
                product
                    .description
                    .clone()
                    .unwrap_or_else(|| MOCK_DESCRIPTION.to_string()),
            ),
            image_path_in_storage: product.image_path_in_storage.clone(),
            raw_data_json: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{product, source};

    #[tokio::test]
    async fn same_external_id_gives_same_price() {
        let product = product("Kindle Paperwhite 16 GB");
        let source = source(&product, Some("B09SWW583J"), None, true);
        let fetcher = MockPriceFetcher::new();
        let cancel = CancellationToken::new();

        let first = fetcher.fetch(&product, &source, &cancel).await.unwrap();
        let second = fetcher.fetch(&product, &source, &cancel).await.unwrap();

        // "B09SWW583J" is 10 chars long
        assert_eq!(first.price, Decimal::new(2000, 2));
        assert_eq!(first.price, second.price);
        assert_eq!(first.currency, "USD");
    }

    #[test]
    fn identifier_precedence() {
        let product = product("Instant Pot");
        let by_url = source(&product, None, Some("https://example.com/x"), false);
        let by_title = source(&product, None, None, false);

        // 21 chars of url, 11 chars of title
        assert_eq!(MockPriceFetcher::price_for(&product, &by_url), Decimal::new(3100, 2));
        assert_eq!(MockPriceFetcher::price_for(&product, &by_title), Decimal::new(2100, 2));
    }

    #[test]
    fn price_wraps_every_fifty_characters() {
        let product = product("p");
        let long = "x".repeat(53);
        let source = source(&product, Some(&long), None, false);

        assert_eq!(MockPriceFetcher::price_for(&product, &source), Decimal::new(1300, 2));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let product = product("Kettle");
        let source = source(&product, None, None, true);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = MockPriceFetcher::new().fetch(&product, &source, &cancel).await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
    }
}
