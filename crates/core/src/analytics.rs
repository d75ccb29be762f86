use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::market::SalesSummary;
use crate::store::{MarketStore, StoreError};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryPerformance {
    pub category: String,
    pub sales_count: u64,
    pub units: u64,
    pub revenue: f64,
    pub profit: f64,
}

/// Headline figures for the trailing day (sales, price changes) and hour
/// (interactions).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub product_count: u64,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub total_sales: u64,
    pub interactions_last_hour: u32,
    pub price_changes: u64,
    pub categories: Vec<CategoryPerformance>,
}

impl DashboardSnapshot {
    pub async fn collect(store: &dyn MarketStore, now: DateTime<Utc>) -> Result<Self, StoreError> {
        let day_ago = now - Duration::hours(24);
        let hour_ago = now - Duration::hours(1);

        let sales = store.sales_summary(None, day_ago).await?;
        let interactions = store.interaction_summary(None, hour_ago).await?;
        let price_changes = store.price_change_count(day_ago).await?;

        let products = store.list_products().await?;
        let mut by_category: BTreeMap<String, SalesSummary> = BTreeMap::new();
        for product in &products {
            let summary = store.sales_summary(Some(&product.id), day_ago).await?;
            if summary.sale_count == 0 {
                continue;
            }
            let entry = by_category.entry(product.category.clone()).or_default();
            entry.sale_count += summary.sale_count;
            entry.units += summary.units;
            entry.revenue += summary.revenue;
            entry.profit += summary.profit;
        }

        Ok(Self {
            generated_at: now,
            product_count: products.len() as u64,
            total_revenue: sales.revenue,
            total_profit: sales.profit,
            total_sales: sales.sale_count,
            interactions_last_hour: interactions.total(),
            price_changes,
            categories: by_category
                .into_iter()
                .map(|(category, summary)| CategoryPerformance {
                    category,
                    sales_count: summary.sale_count,
                    units: summary.units,
                    revenue: summary.revenue,
                    profit: summary.profit,
                })
                .collect(),
        })
    }
}
