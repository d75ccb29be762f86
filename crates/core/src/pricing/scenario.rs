use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::product::Product;

const SCARCITY_STOCK_RATIO: f64 = 0.3;
const CLEARANCE_STOCK_RATIO: f64 = 0.8;
const DEMAND_TEST_STEP: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Maintain,
    MatchCompetitor,
    UndercutCompetitor,
    Premium,
    ScarcityPremium,
    InventoryClearance,
    DemandTestHigh,
    DemandTestLow,
}

impl Strategy {
    pub const ALL: [Strategy; 8] = [
        Strategy::Maintain,
        Strategy::MatchCompetitor,
        Strategy::UndercutCompetitor,
        Strategy::Premium,
        Strategy::ScarcityPremium,
        Strategy::InventoryClearance,
        Strategy::DemandTestHigh,
        Strategy::DemandTestLow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maintain => "maintain",
            Self::MatchCompetitor => "match_competitor",
            Self::UndercutCompetitor => "undercut_competitor",
            Self::Premium => "premium",
            Self::ScarcityPremium => "scarcity_premium",
            Self::InventoryClearance => "inventory_clearance",
            Self::DemandTestHigh => "demand_test_high",
            Self::DemandTestLow => "demand_test_low",
        }
    }

    /// Human-readable justification stored with the price history row.
    pub fn reason(&self, product: &Product) -> String {
        match self {
            Self::Maintain => {
                "Optimal price maintained based on current market conditions".to_string()
            }
            Self::MatchCompetitor => {
                "Price adjusted to match competitor average for competitiveness".to_string()
            }
            Self::UndercutCompetitor => "Strategic price reduction to gain market share".to_string(),
            Self::Premium => "Premium pricing strategy based on product value proposition".to_string(),
            Self::ScarcityPremium => {
                format!("Low stock ({} units) - scarcity pricing applied", product.stock_level)
            }
            Self::InventoryClearance => format!(
                "High inventory ({} units) - clearance pricing to accelerate sales",
                product.stock_level
            ),
            Self::DemandTestHigh => {
                "Testing higher price point based on strong demand signals".to_string()
            }
            Self::DemandTestLow => {
                "Price optimization to stimulate demand and maximize revenue".to_string()
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate price and the strategy that proposed it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub strategy: Strategy,
    pub price: f64,
}

impl Scenario {
    pub fn new(strategy: Strategy, price: f64) -> Self {
        Self { strategy, price }
    }
}

/// Candidate prices in a fixed strategy order.
///
/// Candidates are not deduplicated; two strategies may propose the same price.
/// `competitor_avg <= 0` means there is no competitor signal and the
/// competitor-based strategies are skipped.
pub fn generate_scenarios(product: &Product, competitor_avg: f64) -> Vec<Scenario> {
    let current = product.current_price;
    let step = DEMAND_TEST_STEP * product.price_range();
    let mut scenarios = vec![Scenario::new(Strategy::Maintain, current)];

    if competitor_avg > 0.0 {
        for (strategy, price) in [
            (Strategy::MatchCompetitor, competitor_avg),
            (Strategy::UndercutCompetitor, competitor_avg * 0.95),
            (Strategy::Premium, competitor_avg * 1.10),
        ] {
            if product.contains_price(price) {
                scenarios.push(Scenario::new(strategy, price));
            }
        }
    }

    let stock_ratio = product.stock_ratio();
    if stock_ratio < SCARCITY_STOCK_RATIO {
        scenarios.push(Scenario::new(
            Strategy::ScarcityPremium,
            (current * 1.15).min(product.max_price),
        ));
    } else if stock_ratio > CLEARANCE_STOCK_RATIO {
        scenarios.push(Scenario::new(
            Strategy::InventoryClearance,
            (current * 0.90).max(product.min_price),
        ));
    }

    scenarios.push(Scenario::new(Strategy::DemandTestHigh, (current + step).min(product.max_price)));
    scenarios.push(Scenario::new(Strategy::DemandTestLow, (current - step).max(product.min_price)));
    scenarios
}

#[cfg(test)]
mod tests {
    use super::{generate_scenarios, Strategy};
    use crate::domain::product::{Product, ProductId};

    fn product(stock_level: u32) -> Product {
        Product {
            id: ProductId("prod-001".to_string()),
            name: "Wireless Headphones Pro".to_string(),
            category: "Electronics".to_string(),
            base_cost: 50.0,
            current_price: 100.0,
            stock_level,
            initial_stock: 100,
            min_price: 50.0,
            max_price: 150.0,
            min_margin_percent: 25.0,
        }
    }

    fn strategies(scenarios: &[super::Scenario]) -> Vec<Strategy> {
        scenarios.iter().map(|scenario| scenario.strategy).collect()
    }

    #[test]
    fn low_stock_adds_scarcity_premium() {
        let scenarios = generate_scenarios(&product(15), 0.0);

        assert_eq!(
            strategies(&scenarios),
            vec![
                Strategy::Maintain,
                Strategy::ScarcityPremium,
                Strategy::DemandTestHigh,
                Strategy::DemandTestLow
            ]
        );
        assert!((scenarios[1].price - 115.0).abs() < 1e-9);
        assert!((scenarios[2].price - 105.0).abs() < 1e-9);
        assert!((scenarios[3].price - 95.0).abs() < 1e-9);
    }

    #[test]
    fn high_stock_adds_clearance_and_competitor_strategies_respect_bounds() {
        // 0.95 * 55 = 52.25 stays in range, 1.10 * 55 = 60.5 as well
        let scenarios = generate_scenarios(&product(90), 55.0);

        assert_eq!(
            strategies(&scenarios),
            vec![
                Strategy::Maintain,
                Strategy::MatchCompetitor,
                Strategy::UndercutCompetitor,
                Strategy::Premium,
                Strategy::InventoryClearance,
                Strategy::DemandTestHigh,
                Strategy::DemandTestLow
            ]
        );
        assert!((scenarios[4].price - 90.0).abs() < 1e-9);

        // 0.95 * 52 falls below the floor
        let near_floor = generate_scenarios(&product(50), 52.0);
        assert_eq!(
            strategies(&near_floor),
            vec![
                Strategy::Maintain,
                Strategy::MatchCompetitor,
                Strategy::Premium,
                Strategy::DemandTestHigh,
                Strategy::DemandTestLow
            ]
        );
    }

    #[test]
    fn bounded_strategies_clamp_to_range() {
        let mut at_ceiling = product(10);
        at_ceiling.current_price = 148.0;

        let scenarios = generate_scenarios(&at_ceiling, 0.0);

        assert_eq!(scenarios[1].price, 150.0);
        assert_eq!(scenarios[2].price, 150.0);
    }

    #[test]
    fn duplicate_prices_are_kept() {
        let scenarios = generate_scenarios(&product(50), 100.0);
        let at_current =
            scenarios.iter().filter(|scenario| (scenario.price - 100.0).abs() < 1e-9).count();

        assert_eq!(at_current, 2);
    }

    #[test]
    fn reasons_mention_stock_for_inventory_strategies() {
        assert_eq!(
            Strategy::ScarcityPremium.reason(&product(12)),
            "Low stock (12 units) - scarcity pricing applied"
        );
        assert_eq!(
            Strategy::InventoryClearance.reason(&product(95)),
            "High inventory (95 units) - clearance pricing to accelerate sales"
        );
    }
}
