use axum::{routing::get, Router};
use crate::handlers::health::{db_health, health_check};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "TagTrack API" }))
        .route("/health", get(health_check))
        .route("/health/db", get(db_health))
}
