use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A catalog entry whose price is managed by the optimizer.
///
/// `min_price <= current_price <= max_price` holds for every committed price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub base_cost: f64,
    pub current_price: f64,
    pub stock_level: u32,
    pub initial_stock: u32,
    pub min_price: f64,
    pub max_price: f64,
    pub min_margin_percent: f64,
}

impl Product {
    pub fn price_range(&self) -> f64 {
        self.max_price - self.min_price
    }

    /// Where the current price sits inside `[min_price, max_price]`, 0.0 at the floor.
    pub fn price_position(&self) -> f64 {
        self.price_position_at(self.current_price)
    }

    pub fn price_position_at(&self, price: f64) -> f64 {
        let range = self.price_range();
        if range <= 0.0 {
            return 0.0;
        }
        (price - self.min_price) / range
    }

    pub fn stock_ratio(&self) -> f64 {
        if self.initial_stock == 0 {
            return 0.0;
        }
        f64::from(self.stock_level) / f64::from(self.initial_stock)
    }

    pub fn margin_percent_at(&self, price: f64) -> f64 {
        if price <= 0.0 {
            return f64::NEG_INFINITY;
        }
        (price - self.base_cost) / price * 100.0
    }

    pub fn contains_price(&self, price: f64) -> bool {
        price >= self.min_price && price <= self.max_price
    }

    /// Hypothetical copy of this product listed at `price`.
    pub fn at_price(&self, price: f64) -> Self {
        Self { current_price: price, ..self.clone() }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.0.trim().is_empty() {
            return Err(DomainError::InvariantViolation("product id cannot be empty".to_string()));
        }
        if !(self.base_cost > 0.0) {
            return Err(DomainError::InvariantViolation(format!(
                "product {} must have a positive base cost",
                self.id
            )));
        }
        if self.initial_stock == 0 {
            return Err(DomainError::InvariantViolation(format!(
                "product {} must have a positive initial stock",
                self.id
            )));
        }
        if !(self.min_price <= self.current_price && self.current_price <= self.max_price) {
            return Err(DomainError::PriceOutOfBounds {
                product_id: self.id.clone(),
                price: self.current_price,
                min_price: self.min_price,
                max_price: self.max_price,
            });
        }
        Ok(())
    }
}
