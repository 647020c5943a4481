pub mod config;
pub mod page;
pub mod product;
