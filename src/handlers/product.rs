// src/handlers/product.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use http::header::LOCATION;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::dtos::pagination::{
    clamp_page, clamp_page_size, SearchQuery, DETAIL_PRICES, RECENT_PRODUCTS,
};
use crate::dtos::price::PriceSnapshotResponse;
use crate::dtos::product::{
    CreateProductRequest, CreateSourceRequest, ProductDetailResponse, ProductResponse,
    SearchResponse, SourceResponse,
};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::StoreError;

// GET /products - Most recently updated products
#[instrument(skip(state))]
pub async fn get_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    match state.store.recent_products(RECENT_PRODUCTS).await {
        Ok(products) => {
            let response = products.into_iter().map(ProductResponse::from).collect();
            Ok(Json(response))
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch products");
            Err(e.into())
        }
    }
}

// GET /products/search?q=&page=&pageSize= - Title/url substring search
#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let page = clamp_page(params.page);
    let page_size = clamp_page_size(params.page_size);
    let query = params.q.unwrap_or_default();

    let result = state
        .store
        .search_products(&query, (page - 1).saturating_mul(page_size), page_size)
        .await?;

    Ok(Json(SearchResponse {
        items: result.items.into_iter().map(ProductResponse::from).collect(),
        page,
        page_size,
        total: result.total,
    }))
}

// GET /products/{id} - Product with sources and latest prices
#[instrument(skip(state))]
pub async fn get_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ProductDetailResponse>, AppError> {
    let product = state
        .store
        .product(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    let prices = state.store.snapshots(id, DETAIL_PRICES).await?;

    Ok(Json(ProductDetailResponse {
        product: ProductResponse::from(product),
        prices: prices.into_iter().map(PriceSnapshotResponse::from).collect(),
    }))
}

// POST /products - Register a product; a known url answers 409 with the existing record
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    if payload.url.trim().is_empty() {
        return Err(AppError::validation("Url is required"));
    }

    let new_product = payload.into_new_product();

    if let Some(existing) = state.store.product_by_url(&new_product.url).await? {
        return Err(conflict_with(existing));
    }

    let product = match state.store.insert_product(new_product.clone()).await {
        Ok(product) => product,
        // lost a race with a concurrent create for the same url
        Err(StoreError::Conflict(_)) => {
            return match state.store.product_by_url(&new_product.url).await? {
                Some(existing) => Err(conflict_with(existing)),
                None => Err(AppError::conflict("Product url already registered", None)),
            };
        }
        Err(e) => return Err(e.into()),
    };

    info!(product_id = %product.id, url = %product.url, "Product created");

    let location = format!("/api/products/{}", product.id);
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(ProductResponse::from(product)),
    ))
}

fn conflict_with(existing: crate::models::product::Product) -> AppError {
    let body = serde_json::to_value(ProductResponse::from(existing)).ok();
    AppError::conflict("Product url already registered", body)
}

// POST /products/{id}/sources - Attach a marketplace source
#[instrument(skip(state, payload))]
pub async fn create_source(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<CreateSourceRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.store.trim().is_empty() {
        return Err(AppError::validation("Store is required"));
    }

    state
        .store
        .product(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    let source = state.store.insert_source(id, payload.into_new_source()).await?;

    let location = format!("/api/products/{}/sources/{}", id, source.id);
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(SourceResponse::from(source)),
    ))
}
