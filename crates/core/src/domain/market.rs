use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::{Product, ProductId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    CartAdd,
    CartRemove,
    Bounce,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::CartAdd => "cart_add",
            Self::CartRemove => "cart_remove",
            Self::Bounce => "bounce",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "view" => Ok(Self::View),
            "cart_add" => Ok(Self::CartAdd),
            "cart_remove" => Ok(Self::CartRemove),
            "bounce" => Ok(Self::Bounce),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown interaction type `{other}`")))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub product_id: ProductId,
    pub interaction_type: InteractionType,
    pub session_id: String,
    pub price_at_interaction: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompetitorObservation {
    pub product_id: ProductId,
    pub competitor_name: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: f64,
    pub revenue: f64,
    pub profit: f64,
    pub timestamp: DateTime<Utc>,
}

impl SaleRecord {
    /// A sale of `quantity` units at the product's current list price.
    pub fn at_current_price(product: &Product, quantity: u32, timestamp: DateTime<Utc>) -> Self {
        let units = f64::from(quantity);
        Self {
            product_id: product.id.clone(),
            quantity,
            price: product.current_price,
            revenue: product.current_price * units,
            profit: (product.current_price - product.base_cost) * units,
            timestamp,
        }
    }
}

/// Result of the conditional stock-decrement + sale-insert pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaleOutcome {
    Recorded { remaining_stock: u32 },
    InsufficientStock { available: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryRecord {
    pub product_id: ProductId,
    pub old_price: f64,
    pub new_price: f64,
    pub reason: String,
    pub demand_score: f64,
    pub competitor_avg: f64,
    pub stock_level: u32,
    pub timestamp: DateTime<Utc>,
}

/// Interaction counts over a time window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionSummary {
    pub views: u32,
    pub cart_adds: u32,
    pub cart_removes: u32,
    pub bounces: u32,
}

impl InteractionSummary {
    pub fn from_types<I>(types: I) -> Self
    where
        I: IntoIterator<Item = InteractionType>,
    {
        types.into_iter().fold(Self::default(), |mut summary, kind| {
            summary.add(kind, 1);
            summary
        })
    }

    pub fn add(&mut self, kind: InteractionType, count: u32) {
        match kind {
            InteractionType::View => self.views += count,
            InteractionType::CartAdd => self.cart_adds += count,
            InteractionType::CartRemove => self.cart_removes += count,
            InteractionType::Bounce => self.bounces += count,
        }
    }

    pub fn total(&self) -> u32 {
        self.views + self.cart_adds + self.cart_removes + self.bounces
    }

    /// `(0.3·views + 0.7·cart_adds − 0.5·bounces) / max(views + cart_adds + bounces, 1)`
    /// clamped to `[0, 1]`. Cart removals carry no weight.
    pub fn engagement_score(&self) -> f64 {
        let weighted = 0.3 * f64::from(self.views) + 0.7 * f64::from(self.cart_adds)
            - 0.5 * f64::from(self.bounces);
        let counted = (self.views + self.cart_adds + self.bounces).max(1);
        (weighted / f64::from(counted)).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub sale_count: u64,
    pub units: u64,
    pub revenue: f64,
    pub profit: f64,
}

impl SalesSummary {
    pub fn include(&mut self, sale: &SaleRecord) {
        self.sale_count += 1;
        self.units += u64::from(sale.quantity);
        self.revenue += sale.revenue;
        self.profit += sale.profit;
    }
}
