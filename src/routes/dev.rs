use axum::{routing::post, Router};
use crate::handlers::dev::{seed_demo, seed_sample_products};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dev/seed", post(seed_demo))
        .route("/dev/seed-sample-products", post(seed_sample_products))
}
