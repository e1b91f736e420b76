use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image_path_in_storage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub sources: Vec<ProductSource>,
}

impl Product {
    /// Source used when the caller does not name one: the first source flagged
    /// primary, otherwise the first source in stored order.
    pub fn preferred_source(&self) -> Option<&ProductSource> {
        self.sources
            .iter()
            .find(|s| s.is_primary)
            .or_else(|| self.sources.first())
    }

    /// Explicit source lookup, restricted to sources this product owns.
    pub fn source(&self, source_id: Uuid) -> Option<&ProductSource> {
        self.sources.iter().find(|s| s.id == source_id)
    }

    /// `Some(id)` selects that owned source, `None` falls back to the preferred one.
    pub fn select_source(&self, source_id: Option<Uuid>) -> Option<&ProductSource> {
        match source_id {
            Some(id) => self.source(id),
            None => self.preferred_source(),
        }
    }

    /// Fills an empty description or image from `fetched` and moves
    /// `updated_at` strictly forward. Non-empty values are never replaced.
    pub fn apply_fetched(&mut self, fetched: &FetchedMetadata) {
        backfill(&mut self.description, fetched.description.as_deref());
        backfill(
            &mut self.image_path_in_storage,
            fetched.image_path_in_storage.as_deref(),
        );
        self.updated_at = fetched
            .observed_at
            .max(self.updated_at + Duration::microseconds(1));
    }
}

fn backfill(slot: &mut Option<String>, candidate: Option<&str>) {
    let empty = slot.as_deref().map_or(true, str::is_empty);
    if let Some(value) = candidate.filter(|v| !v.is_empty()) {
        if empty {
            *slot = Some(value.to_string());
        }
    }
}

/// What a successful fetch may write back onto its product.
#[derive(Debug, Clone)]
pub struct FetchedMetadata {
    pub description: Option<String>,
    pub image_path_in_storage: Option<String>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProductSource {
    pub id: Uuid,
    pub product_id: Uuid,
    pub store: String,
    pub external_id: Option<String>,
    pub source_url: Option<String>,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image_path_in_storage: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProductSource {
    pub store: String,
    pub external_id: Option<String>,
    pub source_url: Option<String>,
    pub is_primary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(product_id: Uuid, is_primary: bool) -> ProductSource {
        ProductSource {
            id: Uuid::new_v4(),
            product_id,
            store: "amazon".to_string(),
            external_id: None,
            source_url: None,
            is_primary,
        }
    }

    fn product_with(sources: Vec<ProductSource>) -> Product {
        Product {
            id: Uuid::new_v4(),
            title: "Kettle".to_string(),
            url: "https://example.com/kettle".to_string(),
            description: None,
            image_path_in_storage: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            sources,
        }
    }

    #[test]
    fn prefers_primary_source() {
        let id = Uuid::new_v4();
        let first = source(id, false);
        let primary = source(id, true);
        let product = product_with(vec![first, primary.clone()]);

        assert_eq!(product.preferred_source().map(|s| s.id), Some(primary.id));
    }

    #[test]
    fn falls_back_to_first_source() {
        let id = Uuid::new_v4();
        let first = source(id, false);
        let product = product_with(vec![first.clone(), source(id, false)]);

        assert_eq!(product.preferred_source().map(|s| s.id), Some(first.id));
    }

    #[test]
    fn first_primary_wins_when_several_are_flagged() {
        let id = Uuid::new_v4();
        let a = source(id, true);
        let b = source(id, true);
        let product = product_with(vec![a.clone(), b]);

        assert_eq!(product.preferred_source().map(|s| s.id), Some(a.id));
    }

    fn fetched(description: Option<&str>) -> FetchedMetadata {
        FetchedMetadata {
            description: description.map(str::to_string),
            image_path_in_storage: Some("images/kettle.jpg".to_string()),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn backfill_only_touches_empty_fields() {
        let mut product = product_with(vec![]);
        product.description = Some(String::new());

        product.apply_fetched(&fetched(Some("Steel kettle")));
        product.apply_fetched(&fetched(Some("Other copy")));

        assert_eq!(product.description.as_deref(), Some("Steel kettle"));
        assert_eq!(product.image_path_in_storage.as_deref(), Some("images/kettle.jpg"));
    }

    #[test]
    fn blank_fetched_values_are_ignored() {
        let mut product = product_with(vec![]);

        product.apply_fetched(&fetched(Some("")));

        assert!(product.description.is_none());
    }

    #[test]
    fn updated_at_always_advances() {
        let mut product = product_with(vec![]);
        let future = product.updated_at + Duration::hours(1);
        product.updated_at = future;

        product.apply_fetched(&fetched(None));

        assert!(product.updated_at > future);
        assert!(product.description.is_none());
    }

    #[test]
    fn explicit_source_must_be_owned() {
        let product = product_with(vec![source(Uuid::new_v4(), true)]);

        assert!(product.select_source(Some(Uuid::new_v4())).is_none());
        assert!(product.select_source(None).is_some());
        assert!(product_with(vec![]).select_source(None).is_none());
    }
}
