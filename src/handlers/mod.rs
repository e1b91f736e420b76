pub mod dev;
pub mod health;
pub mod price;
pub mod product;
