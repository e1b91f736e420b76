pub mod pagination;
pub mod price;
pub mod product;
