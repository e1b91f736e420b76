//! Live fetcher: downloads the source's product page and scrapes the price.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::{Client, ClientBuilder};
use scraper::{Html, Selector};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::price_fetcher::{to_cents, FetchError, FetchResult, PriceFetcher, DEFAULT_CURRENCY};
use super::price_parser::{select_attr, select_text, ParseError, PriceMatch, PriceParser};
use crate::config::ScraperConfig;
use crate::models::product::{Product, ProductSource};

/// Builds the url to scrape: the source's own url, else the store's
/// `/dp/{externalId}` page, else the product url.
pub fn resolve_source_url(
    base_url: &str,
    product: &Product,
    source: &ProductSource,
) -> Result<String, FetchError> {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(url) = present(&source.source_url) {
        return Ok(url);
    }
    if let Some(external_id) = present(&source.external_id) {
        return Ok(format!(
            "{}/dp/{}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&external_id)
        ));
    }
    if !product.url.trim().is_empty() {
        return Ok(product.url.trim().to_string());
    }
    Err(FetchError::Configuration {
        source_id: source.id,
        reason: "source needs a sourceUrl or externalId".to_string(),
    })
}

/// Fields scraped from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPage {
    pub price: PriceMatch,
    pub title: Option<String>,
    pub image: Option<String>,
}

pub struct ScraperPriceFetcher {
    client: Client,
    config: ScraperConfig,
    parser: PriceParser,
    price_selectors: Vec<(String, Selector)>,
    title_selector: Selector,
    image_selector: Selector,
}

fn compile(raw: &str) -> Result<Selector, String> {
    Selector::parse(raw).map_err(|e| format!("invalid selector {raw:?}: {e:?}"))
}

fn client_builder(config: &ScraperConfig) -> ClientBuilder {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout)
        .gzip(true)
        .brotli(true)
}

impl ScraperPriceFetcher {
    pub fn new(config: ScraperConfig) -> anyhow::Result<Self> {
        let client = client_builder(&config).build()?;
        Self::with_client(config, client)
    }

    fn with_client(config: ScraperConfig, client: Client) -> anyhow::Result<Self> {
        let parser = PriceParser::new()?;
        let price_selectors = config
            .price_selectors
            .iter()
            .map(|raw| compile(raw).map(|sel| (raw.clone(), sel)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(anyhow::Error::msg)?;
        let title_selector = compile(&config.title_selector).map_err(anyhow::Error::msg)?;
        let image_selector = compile(&config.image_selector).map_err(anyhow::Error::msg)?;

        Ok(Self {
            client,
            config,
            parser,
            price_selectors,
            title_selector,
            image_selector,
        })
    }

    /// Pure page parsing; kept synchronous because `Html` is not `Send`.
    pub fn scrape(&self, html: &str) -> Result<ScrapedPage, ParseError> {
        let document = Html::parse_document(html);
        let price = self.parser.extract(&document, &self.price_selectors)?;

        Ok(ScrapedPage {
            price,
            title: select_text(&document, &self.title_selector),
            image: select_attr(&document, &self.image_selector, "src"),
        })
    }

    async fn download(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT_LANGUAGE, &self.config.accept_language)
            .send()
            .await
            .map_err(|error| FetchError::Transport {
                url: url.to_string(),
                error,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|error| FetchError::Transport {
            url: url.to_string(),
            error,
        })
    }
}

#[async_trait]
impl PriceFetcher for ScraperPriceFetcher {
    async fn fetch(
        &self,
        product: &Product,
        source: &ProductSource,
        cancel: &CancellationToken,
    ) -> Result<FetchResult, FetchError> {
        let url = resolve_source_url(&self.config.base_url, product, source)?;

        info!(
            product_id = %product.id,
            source_id = %source.id,
            %url,
            "Scraping price"
        );

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            body = self.download(&url) => body?,
        };

        let page = self.scrape(&body)?;
        debug!(selector = %page.price.selector, text = %page.price.text, "Matched price node");

        let raw = json!({
            "url": url,
            "selector": page.price.selector,
            "text": page.price.text,
        });

        Ok(FetchResult {
            price: to_cents(page.price.price.amount),
            currency: page
                .price
                .price
                .currency()
                .unwrap_or(DEFAULT_CURRENCY)
                .to_string(),
            collected_at: Utc::now(),
            description: page.title.or_else(|| Some(product.title.clone())),
            image_path_in_storage: page.image.or_else(|| product.image_path_in_storage.clone()),
            raw_data_json: Some(raw.to_string()),
        })
    }
}
