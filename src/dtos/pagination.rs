// src/dtos/pagination.rs
use serde::Deserialize;
use uuid::Uuid;

pub const DEFAULT_TAKE: i64 = 50;
pub const MAX_TAKE: i64 = 200;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 50;
pub const RECENT_PRODUCTS: i64 = 50;
pub const DETAIL_PRICES: i64 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct PricesQuery {
    pub take: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceQuery {
    pub source_id: Option<Uuid>,
}

/// `take` for price history: 1..=200, default 50.
pub fn clamp_take(take: Option<i64>) -> i64 {
    take.map_or(DEFAULT_TAKE, |t| t.clamp(1, MAX_TAKE))
}

/// 1-based page number, floored at 1.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Search page size: 1..=50, default 20.
pub fn clamp_page_size(page_size: Option<i64>) -> i64 {
    page_size.map_or(DEFAULT_PAGE_SIZE, |s| s.clamp(1, MAX_PAGE_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_is_clamped() {
        assert_eq!(clamp_take(None), 50);
        assert_eq!(clamp_take(Some(9999)), 200);
        assert_eq!(clamp_take(Some(0)), 1);
        assert_eq!(clamp_take(Some(-5)), 1);
        assert_eq!(clamp_take(Some(75)), 75);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(500)), 50);
        assert_eq!(clamp_page_size(None), 20);
    }

    #[test]
    fn page_is_at_least_one() {
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(-3)), 1);
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(4)), 4);
    }
}
