pub mod dev;
pub mod health;
pub mod products;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

/// Catalog routes, mounted under `/api`.
pub fn create_router() -> Router<AppState> {
    Router::new().merge(products::routes())
}

/// Full application: `/api`, health probes, dev seeding, CORS and request tracing.
pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", create_router())
        .merge(health::routes())
        .merge(dev::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
