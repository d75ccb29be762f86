use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::market::{
    CompetitorObservation, InteractionRecord, InteractionSummary, PriceHistoryRecord,
    SaleOutcome, SaleRecord, SalesSummary,
};
use crate::domain::product::{Product, ProductId};

pub mod memory;

pub use memory::InMemoryMarketStore;

pub type SharedStore = Arc<dyn MarketStore>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Relational view over products and their append-only market history.
///
/// Windowed queries include rows strictly newer than `since`. Product listings
/// are ordered by product id.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;

    async fn get_product(&self, id: &ProductId) -> Result<Product, StoreError> {
        self.find_product(id).await?.ok_or_else(|| StoreError::ProductNotFound(id.clone()))
    }

    async fn count_products(&self) -> Result<u64, StoreError>;

    async fn insert_product(&self, product: Product) -> Result<(), StoreError>;

    async fn record_interaction(&self, interaction: InteractionRecord) -> Result<(), StoreError>;

    /// Decrements stock and appends the sale as one unit. Never oversells: when
    /// stock is short nothing is written.
    async fn record_sale(&self, sale: SaleRecord) -> Result<SaleOutcome, StoreError>;

    async fn record_competitor_price(
        &self,
        observation: CompetitorObservation,
    ) -> Result<(), StoreError>;

    /// Sets `current_price` to `change.new_price` and appends the history row as one unit.
    async fn apply_price_change(&self, change: PriceHistoryRecord) -> Result<(), StoreError>;

    /// Most recent first.
    async fn price_history(
        &self,
        id: &ProductId,
        limit: usize,
    ) -> Result<Vec<PriceHistoryRecord>, StoreError>;

    /// Average over the latest `limit` competitor observations for the product.
    async fn recent_competitor_average(
        &self,
        id: &ProductId,
        limit: usize,
    ) -> Result<Option<f64>, StoreError>;

    async fn competitor_average(
        &self,
        id: &ProductId,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, StoreError>;

    async fn interaction_summary(
        &self,
        id: Option<&ProductId>,
        since: DateTime<Utc>,
    ) -> Result<InteractionSummary, StoreError>;

    async fn sales_summary(
        &self,
        id: Option<&ProductId>,
        since: DateTime<Utc>,
    ) -> Result<SalesSummary, StoreError>;

    async fn price_change_count(&self, since: DateTime<Utc>) -> Result<u64, StoreError>;
}
