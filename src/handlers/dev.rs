// src/handlers/dev.rs
use axum::{extract::State, Json};
use tracing::{info, instrument};

use crate::dtos::product::{ProductResponse, SeedResponse, SeedSamplesResponse};
use crate::error::AppError;
use crate::models::product::{NewProduct, NewProductSource, Product, ProductSource};
use crate::state::AppState;
use crate::store::PriceStore;

const SEED_STORE: &str = "amazon";

struct Sample {
    title: &'static str,
    url: &'static str,
    external_id: &'static str,
    source_url: &'static str,
    description: Option<&'static str>,
}

const DEMO: Sample = Sample {
    title: "Demo Product",
    url: "https://example.com/demo-product",
    external_id: "DEMO-ASIN-123",
    source_url: "https://amazon.com/dp/DEMO-ASIN-123",
    description: Some("Demo product for testing fetch"),
};

const SAMPLES: [Sample; 3] = [
    Sample {
        title: "Apple AirPods Pro (2nd Gen)",
        url: "https://www.amazon.com/dp/B0CHX1V2W9",
        external_id: "B0CHX1V2W9",
        source_url: "https://www.amazon.com/dp/B0CHX1V2W9",
        description: None,
    },
    Sample {
        title: "Kindle Paperwhite 16 GB",
        url: "https://www.amazon.com/dp/B09SWW583J",
        external_id: "B09SWW583J",
        source_url: "https://www.amazon.com/dp/B09SWW583J",
        description: None,
    },
    Sample {
        title: "Instant Pot Duo 7-in-1",
        url: "https://www.amazon.com/dp/B08PQ2KWHS",
        external_id: "B08PQ2KWHS",
        source_url: "https://www.amazon.com/dp/B08PQ2KWHS",
        description: None,
    },
];

/// Finds or creates the sample product and its amazon source.
async fn ensure_sample(
    store: &dyn PriceStore,
    sample: &Sample,
) -> Result<(Product, ProductSource), AppError> {
    let mut product = match store.product_by_url(sample.url).await? {
        Some(product) => product,
        None => {
            store
                .insert_product(NewProduct {
                    title: sample.title.to_string(),
                    url: sample.url.to_string(),
                    description: sample.description.map(str::to_string),
                    image_path_in_storage: None,
                })
                .await?
        }
    };

    let existing = product.sources.iter().find(|s| s.store == SEED_STORE).cloned();
    let source = match existing {
        Some(source) => source,
        None => {
            let source = store
                .insert_source(
                    product.id,
                    NewProductSource {
                        store: SEED_STORE.to_string(),
                        external_id: Some(sample.external_id.to_string()),
                        source_url: Some(sample.source_url.to_string()),
                        is_primary: true,
                    },
                )
                .await?;
            product.sources.push(source.clone());
            source
        }
    };

    Ok((product, source))
}

// POST /dev/seed - Idempotent demo product
#[instrument(skip(state))]
pub async fn seed_demo(State(state): State<AppState>) -> Result<Json<SeedResponse>, AppError> {
    let (product, source) = ensure_sample(state.store.as_ref(), &DEMO).await?;
    info!(product_id = %product.id, source_id = %source.id, "Demo product seeded");

    Ok(Json(SeedResponse {
        product_id: product.id,
        source_id: source.id,
        product: product.into(),
    }))
}

// POST /dev/seed-sample-products - Idempotent sample catalog
#[instrument(skip(state))]
pub async fn seed_sample_products(
    State(state): State<AppState>,
) -> Result<Json<SeedSamplesResponse>, AppError> {
    let mut items = Vec::with_capacity(SAMPLES.len());
    for sample in &SAMPLES {
        let (product, _) = ensure_sample(state.store.as_ref(), sample).await?;
        items.push(ProductResponse::from(product));
    }

    Ok(Json(SeedSamplesResponse {
        count: items.len(),
        items,
    }))
}
