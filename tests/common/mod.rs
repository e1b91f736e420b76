#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use tagtrack_backend::routes::build_app;
use tagtrack_backend::services::{IngestionService, MockPriceFetcher};
use tagtrack_backend::state::AppState;
use tagtrack_backend::store::MemoryStore;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let ingestion = Arc::new(IngestionService::new(
            store.clone(),
            Arc::new(MockPriceFetcher::new()),
        ));
        let state = AppState::new(store.clone(), ingestion, CancellationToken::new());
        let router = build_app(state, &["http://localhost:5173".to_string()]);
        Self { router, store }
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        Response { status, location, body }
    }

    /// Creates a product with one primary source; returns (product id, source id).
    pub async fn product_with_source(&self, title: &str, url: &str, external_id: &str) -> (String, String) {
        let created = self
            .request(
                "POST",
                "/api/products",
                Some(serde_json::json!({ "title": title, "url": url })),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED);
        let product_id = created.body["id"].as_str().unwrap().to_string();

        let source = self
            .request(
                "POST",
                &format!("/api/products/{product_id}/sources"),
                Some(serde_json::json!({
                    "store": "amazon",
                    "externalId": external_id,
                    "isPrimary": true
                })),
            )
            .await;
        assert_eq!(source.status, StatusCode::CREATED);
        let source_id = source.body["id"].as_str().unwrap().to_string();

        (product_id, source_id)
    }
}

pub struct Response {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}
