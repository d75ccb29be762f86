use serde::{Deserialize, Serialize};

use crate::domain::market::InteractionSummary;
use crate::domain::product::Product;

pub const FEATURE_DIM: usize = 8;

/// Category that gets the indicator bit.
pub const INDICATOR_CATEGORY: &str = "Electronics";

/// Engineered demand signals before normalization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFeatures {
    /// Where the price sits in `[min_price, max_price]`.
    pub price_position: f64,
    pub stock_ratio: f64,
    /// Price over competitor average. Below 1 is cheaper than the market.
    pub competitiveness: f64,
    pub margin_ratio: f64,
    pub time_multiplier: f64,
    pub interaction_score: f64,
    pub category_indicator: f64,
    pub log_stock: f64,
}

impl RawFeatures {
    /// `competitor_avg <= 0` means no competitor data and yields neutral competitiveness.
    pub fn extract(
        product: &Product,
        competitor_avg: f64,
        time_multiplier: f64,
        interactions: &InteractionSummary,
    ) -> Self {
        let price = product.current_price;
        let competitiveness = if competitor_avg > 0.0 { price / competitor_avg } else { 1.0 };
        let margin_ratio = if price > 0.0 { (price - product.base_cost) / price } else { 0.0 };

        Self {
            price_position: product.price_position(),
            stock_ratio: product.stock_ratio(),
            competitiveness,
            margin_ratio,
            time_multiplier,
            interaction_score: interactions.engagement_score(),
            category_indicator: if product.category == INDICATOR_CATEGORY { 1.0 } else { 0.0 },
            log_stock: (f64::from(product.stock_level) + 1.0).ln() / 10.0,
        }
    }

    pub fn normalize(&self) -> NormalizedFeatures {
        NormalizedFeatures {
            price_position: unit(self.price_position),
            stock_ratio: unit(self.stock_ratio),
            competitiveness: self.competitiveness.min(2.0) / 2.0,
            margin_ratio: unit(self.margin_ratio),
            time_multiplier: unit(self.time_multiplier),
            interaction_score: unit(self.interaction_score),
            category_indicator: unit(self.category_indicator),
            log_stock: self.log_stock.min(1.0),
        }
    }
}

fn unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Model input: every dimension in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFeatures {
    pub price_position: f64,
    pub stock_ratio: f64,
    pub competitiveness: f64,
    pub margin_ratio: f64,
    pub time_multiplier: f64,
    pub interaction_score: f64,
    pub category_indicator: f64,
    pub log_stock: f64,
}

impl NormalizedFeatures {
    pub fn to_vector(&self) -> [f64; FEATURE_DIM] {
        [
            self.price_position,
            self.stock_ratio,
            self.competitiveness,
            self.margin_ratio,
            self.time_multiplier,
            self.interaction_score,
            self.category_indicator,
            self.log_stock,
        ]
    }
}
