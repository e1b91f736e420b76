// src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tagtrack_backend::config::{AppConfig, FetcherKind};
use tagtrack_backend::services::{
    IngestionService, MockPriceFetcher, PriceFetcher, PriceRefresher, ScraperPriceFetcher,
};
use tagtrack_backend::store::{MemoryStore, PgStore, PriceStore};
use tagtrack_backend::{database, routes, state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tagtrack_backend=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Create store
    let store: Arc<dyn PriceStore> = match &config.database_url {
        Some(url) => {
            let pool = database::create_pool(url)
                .await
                .context("Failed to create database pool")?;
            database::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let fetcher: Arc<dyn PriceFetcher> = match config.fetcher {
        FetcherKind::Scraper => Arc::new(ScraperPriceFetcher::new(config.scraper.clone())?),
        FetcherKind::Mock => Arc::new(MockPriceFetcher::new()),
    };
    tracing::info!(fetcher = ?config.fetcher, "Price fetcher selected");

    let ingestion = Arc::new(IngestionService::new(store.clone(), fetcher));
    let shutdown = CancellationToken::new();

    let refresher = PriceRefresher::new(store.clone(), ingestion.clone(), config.refresh.clone())
        .spawn(shutdown.child_token());

    // Create application state
    let app_state = state::AppState::new(store, ingestion, shutdown.clone());
    let app = routes::build_app(app_state, &config.allowed_origins);

    // Try base port..base port+20 to avoid crash when address is in use
    let listener = {
        let mut bound = None;
        for offset in 0u16..=20 {
            let port = config.port.saturating_add(offset);
            let addr = SocketAddr::from((config.host, port));
            match TcpListener::bind(addr).await {
                Ok(l) => { bound = Some((l, addr)); break; }
                Err(e) => {
                    if offset == 0 { tracing::warn!(%addr, error=%e, "Port in use, trying next"); }
                }
            }
        }
        match bound {
            Some((l, addr)) => {
                tracing::info!("Server running on {}", addr);
                l
            }
            None => {
                shutdown.cancel();
                anyhow::bail!("Failed to bind to any port starting at {} on {}", config.port, config.host);
            }
        }
    };

    let signal = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            signal.cancel();
        })
        .await;

    shutdown.cancel();
    if let Err(e) = refresher.await {
        tracing::error!(error = %e, "Price refresh task ended abnormally");
    }

    if let Err(e) = served {
        tracing::error!(error=%e, "Server error");
    }
    Ok(())
}
