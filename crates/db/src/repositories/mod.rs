pub mod market;

pub use market::SqlMarketStore;
