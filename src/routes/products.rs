use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers::price::{fetch_price, fetch_price_live, get_prices};
use crate::handlers::product::{
    create_product, create_source, get_product, get_products, search_products,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(get_products).post(create_product))
        .route("/products/search", get(search_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/sources", post(create_source))
        .route("/products/{id}/prices", get(get_prices))
        .route("/products/{id}/fetch", post(fetch_price))
        .route("/products/{id}/fetch-live", post(fetch_price_live))
}
