pub mod ingestion;
pub mod mock_fetcher;
pub mod price_fetcher;
pub mod price_parser;
pub mod price_refresh;
pub mod scraper_fetcher;

#[cfg(test)]
pub(crate) mod testing;

pub use ingestion::{IngestError, IngestionService, LiveIngestion};
pub use mock_fetcher::MockPriceFetcher;
pub use price_fetcher::{FetchError, FetchResult, PriceFetcher};
pub use price_refresh::{CycleReport, PriceRefresher};
pub use scraper_fetcher::ScraperPriceFetcher;
