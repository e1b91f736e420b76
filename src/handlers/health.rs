// src/handlers/health.rs
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

pub async fn health_check() -> &'static str {
    "OK"
}

// GET /health/db - Store connectivity probe
pub async fn db_health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            warn!(error = %e, "Store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                    "error": "Service Unavailable",
                    "message": e.to_string(),
                })),
            )
        }
    }
}
