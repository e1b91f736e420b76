// src/handlers/price.rs
use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::dtos::pagination::{clamp_take, PricesQuery, SourceQuery};
use crate::dtos::price::{FetchLiveResponse, PriceSnapshotResponse};
use crate::error::AppError;
use crate::state::AppState;

// GET /products/{id}/prices?take= - Price history, newest first
#[instrument(skip(state))]
pub async fn get_prices(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(params): Query<PricesQuery>,
) -> Result<Json<Vec<PriceSnapshotResponse>>, AppError> {
    let take = clamp_take(params.take);
    let prices = state.store.snapshots(id, take).await?;

    Ok(Json(prices.into_iter().map(PriceSnapshotResponse::from).collect()))
}

// POST /products/{id}/fetch?sourceId= - Scrape now and record the snapshot
#[instrument(skip(state))]
pub async fn fetch_price(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(params): Query<SourceQuery>,
) -> Result<Json<PriceSnapshotResponse>, AppError> {
    let cancel = state.shutdown.child_token();
    let snapshot = state
        .ingestion
        .ingest(id, params.source_id, &cancel)
        .await
        .map_err(|e| {
            warn!(product_id = %id, error = %e, "Fetch failed");
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::not_found("Product or source not found"))?;

    Ok(Json(snapshot.into()))
}

// POST /products/{id}/fetch-live?sourceId= - Same as fetch, plus the scraped metadata
#[instrument(skip(state))]
pub async fn fetch_price_live(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(params): Query<SourceQuery>,
) -> Result<Json<FetchLiveResponse>, AppError> {
    let cancel = state.shutdown.child_token();
    let live = state
        .ingestion
        .ingest_live(id, params.source_id, &cancel)
        .await
        .map_err(|e| {
            warn!(product_id = %id, error = %e, "Live fetch failed");
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::not_found("Product or source not found"))?;

    Ok(Json(live.into()))
}
