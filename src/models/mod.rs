pub mod product;
pub mod price_snapshot;
