use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{MarketStore, StoreError};
use crate::domain::market::{
    CompetitorObservation, InteractionRecord, InteractionSummary, PriceHistoryRecord,
    SaleOutcome, SaleRecord, SalesSummary,
};
use crate::domain::product::{Product, ProductId};

#[derive(Default)]
struct MarketTables {
    products: BTreeMap<ProductId, Product>,
    price_history: Vec<PriceHistoryRecord>,
    interactions: Vec<InteractionRecord>,
    competitor_prices: Vec<CompetitorObservation>,
    sales: Vec<SaleRecord>,
}

/// Process-local store. Every write that touches two tables holds the single
/// write lock for its whole duration.
#[derive(Default)]
pub struct InMemoryMarketStore {
    tables: RwLock<MarketTables>,
}

impl InMemoryMarketStore {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|product| (product.id.clone(), product)).collect();
        Self { tables: RwLock::new(MarketTables { products, ..MarketTables::default() }) }
    }

    pub async fn interactions(&self) -> Vec<InteractionRecord> {
        self.tables.read().await.interactions.clone()
    }

    pub async fn sales(&self) -> Vec<SaleRecord> {
        self.tables.read().await.sales.clone()
    }

    pub async fn competitor_prices(&self) -> Vec<CompetitorObservation> {
        self.tables.read().await.competitor_prices.clone()
    }
}

fn matches_product(filter: Option<&ProductId>, id: &ProductId) -> bool {
    filter.map_or(true, |wanted| wanted == id)
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.read().await.products.get(id).cloned())
    }

    async fn count_products(&self) -> Result<u64, StoreError> {
        Ok(self.tables.read().await.products.len() as u64)
    }

    async fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.products.contains_key(&product.id) {
            return Err(StoreError::Persistence(format!("product {} already exists", product.id)));
        }
        tables.products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn record_interaction(&self, interaction: InteractionRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&interaction.product_id) {
            return Err(StoreError::ProductNotFound(interaction.product_id));
        }
        tables.interactions.push(interaction);
        Ok(())
    }

    async fn record_sale(&self, sale: SaleRecord) -> Result<SaleOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&sale.product_id)
            .ok_or_else(|| StoreError::ProductNotFound(sale.product_id.clone()))?;

        if product.stock_level < sale.quantity {
            return Ok(SaleOutcome::InsufficientStock { available: product.stock_level });
        }

        product.stock_level -= sale.quantity;
        let remaining_stock = product.stock_level;
        tables.sales.push(sale);
        Ok(SaleOutcome::Recorded { remaining_stock })
    }

    async fn record_competitor_price(
        &self,
        observation: CompetitorObservation,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&observation.product_id) {
            return Err(StoreError::ProductNotFound(observation.product_id));
        }
        tables.competitor_prices.push(observation);
        Ok(())
    }

    async fn apply_price_change(&self, change: PriceHistoryRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&change.product_id)
            .ok_or_else(|| StoreError::ProductNotFound(change.product_id.clone()))?;
        product.current_price = change.new_price;
        tables.price_history.push(change);
        Ok(())
    }

    async fn price_history(
        &self,
        id: &ProductId,
        limit: usize,
    ) -> Result<Vec<PriceHistoryRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .price_history
            .iter()
            .rev()
            .filter(|record| &record.product_id == id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn recent_competitor_average(
        &self,
        id: &ProductId,
        limit: usize,
    ) -> Result<Option<f64>, StoreError> {
        let tables = self.tables.read().await;
        let mut observations: Vec<&CompetitorObservation> =
            tables.competitor_prices.iter().rev().filter(|row| &row.product_id == id).collect();
        // newest insert first among equal timestamps, matching `recorded_at DESC, id DESC`
        observations.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
        Ok(average(observations.into_iter().take(limit).map(|row| row.price)))
    }

    async fn competitor_average(
        &self,
        id: &ProductId,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, StoreError> {
        let tables = self.tables.read().await;
        Ok(average(
            tables
                .competitor_prices
                .iter()
                .filter(|row| &row.product_id == id && row.timestamp > since)
                .map(|row| row.price),
        ))
    }

    async fn interaction_summary(
        &self,
        id: Option<&ProductId>,
        since: DateTime<Utc>,
    ) -> Result<InteractionSummary, StoreError> {
        let tables = self.tables.read().await;
        Ok(InteractionSummary::from_types(
            tables
                .interactions
                .iter()
                .filter(|row| matches_product(id, &row.product_id) && row.timestamp > since)
                .map(|row| row.interaction_type),
        ))
    }

    async fn sales_summary(
        &self,
        id: Option<&ProductId>,
        since: DateTime<Utc>,
    ) -> Result<SalesSummary, StoreError> {
        let tables = self.tables.read().await;
        let mut summary = SalesSummary::default();
        tables
            .sales
            .iter()
            .filter(|sale| matches_product(id, &sale.product_id) && sale.timestamp > since)
            .for_each(|sale| summary.include(sale));
        Ok(summary)
    }

    async fn price_change_count(&self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.price_history.iter().filter(|record| record.timestamp > since).count() as u64)
    }
}
