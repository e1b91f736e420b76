// src/config.rs
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Shortest refresh interval the scheduler will honor.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherKind {
    Scraper,
    Mock,
}

impl FromStr for FetcherKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scraper" | "live" | "amazon" => Ok(Self::Scraper),
            "mock" => Ok(Self::Mock),
            _ => Err(()),
        }
    }
}

/// Options for the HTML-scraping fetcher.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Store root used to build `/dp/{externalId}` urls.
    pub base_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub timeout: Duration,
    /// Tried in order; the first selector with non-empty text wins.
    pub price_selectors: Vec<String>,
    pub title_selector: String,
    pub image_selector: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.amazon.com".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            timeout: Duration::from_secs(15),
            price_selectors: vec![
                "span#priceblock_ourprice".to_string(),
                "span#priceblock_dealprice".to_string(),
                "span.a-price > span.a-offscreen".to_string(),
                "span[data-a-color*='price'] > span.a-offscreen".to_string(),
            ],
            title_selector: "span#productTitle".to_string(),
            image_selector: "img#landingImage".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// At least 1; `from_env` rejects anything lower.
    pub max_products_per_cycle: i64,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(MIN_REFRESH_INTERVAL_SECS))
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 900,
            max_products_per_cycle: 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub fetcher: FetcherKind,
    pub scraper: ScraperConfig,
    pub refresh: RefreshConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let scraper_defaults = ScraperConfig::default();
        let refresh_defaults = RefreshConfig::default();

        let allowed_origins = get("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        let max_products_per_cycle: i64 = parse(
            &get,
            "PRICE_REFRESH_MAX_PRODUCTS",
            refresh_defaults.max_products_per_cycle,
        )?;
        if max_products_per_cycle < 1 {
            return Err(ConfigError::Invalid {
                key: "PRICE_REFRESH_MAX_PRODUCTS",
                value: max_products_per_cycle.to_string(),
            });
        }

        Ok(Self {
            database_url: get("DATABASE_URL"),
            host: parse(&get, "HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: parse(&get, "PORT", 3000)?,
            allowed_origins,
            fetcher: parse(&get, "PRICE_FETCHER", FetcherKind::Scraper)?,
            scraper: ScraperConfig {
                base_url: get("SCRAPER_BASE_URL").unwrap_or(scraper_defaults.base_url),
                user_agent: get("SCRAPER_USER_AGENT").unwrap_or(scraper_defaults.user_agent),
                accept_language: get("SCRAPER_ACCEPT_LANGUAGE")
                    .unwrap_or(scraper_defaults.accept_language),
                timeout: Duration::from_secs(parse(
                    &get,
                    "SCRAPER_TIMEOUT_SECONDS",
                    scraper_defaults.timeout.as_secs(),
                )?),
                ..scraper_defaults
            },
            refresh: RefreshConfig {
                enabled: parse(&get, "PRICE_REFRESH_ENABLED", refresh_defaults.enabled)?,
                interval_secs: parse(
                    &get,
                    "PRICE_REFRESH_INTERVAL_SECONDS",
                    refresh_defaults.interval_secs,
                )?,
                max_products_per_cycle,
            },
        })
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
