// src/state.rs
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::services::IngestionService;
use crate::store::PriceStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PriceStore>,
    pub ingestion: Arc<IngestionService>,
    /// Cancelled on shutdown; request-scoped fetches run under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PriceStore>,
        ingestion: Arc<IngestionService>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            ingestion,
            shutdown,
        }
    }
}
