pub mod market;
pub mod product;
