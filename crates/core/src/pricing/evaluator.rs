use serde::{Deserialize, Serialize};

use super::scenario::Scenario;
use crate::demand::{DemandEstimator, DemandPrediction};
use crate::domain::market::InteractionSummary;
use crate::domain::product::Product;

/// Share of demand that converts into expected sales per period.
pub const BASE_CONVERSION_RATE: f64 = 0.1;

/// Neutral competitiveness when there is no competitor signal.
pub const NEUTRAL_COMPETITIVENESS: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationWeights {
    pub profit: f64,
    pub competitiveness: f64,
    pub demand: f64,
    pub margin: f64,
}

impl Default for EvaluationWeights {
    fn default() -> Self {
        Self { profit: 0.5, competitiveness: 0.2, demand: 0.2, margin: 0.1 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvaluation {
    pub scenario: Scenario,
    pub demand_score: f64,
    pub confidence: f64,
    pub expected_sales: f64,
    pub expected_revenue: f64,
    pub expected_profit: f64,
    pub margin_percent: f64,
    pub competitiveness_score: f64,
    pub score: f64,
}

impl ScenarioEvaluation {
    pub fn meets_margin_floor(&self, product: &Product) -> bool {
        self.margin_percent >= product.min_margin_percent
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ScenarioEvaluator {
    weights: EvaluationWeights,
}

impl ScenarioEvaluator {
    pub fn new(weights: EvaluationWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> EvaluationWeights {
        self.weights
    }

    /// Scores one candidate by re-estimating demand at the candidate price.
    pub fn evaluate(
        &self,
        estimator: &DemandEstimator,
        product: &Product,
        scenario: Scenario,
        competitor_avg: f64,
        time_multiplier: f64,
        interactions: &InteractionSummary,
    ) -> ScenarioEvaluation {
        let candidate = product.at_price(scenario.price);
        let demand =
            estimator.predict_with(&candidate, competitor_avg, time_multiplier, interactions);
        self.score(product, scenario, competitor_avg, time_multiplier, &demand)
    }

    pub fn evaluate_all(
        &self,
        estimator: &DemandEstimator,
        product: &Product,
        scenarios: &[Scenario],
        competitor_avg: f64,
        time_multiplier: f64,
        interactions: &InteractionSummary,
    ) -> Vec<ScenarioEvaluation> {
        scenarios
            .iter()
            .map(|scenario| {
                self.evaluate(
                    estimator,
                    product,
                    *scenario,
                    competitor_avg,
                    time_multiplier,
                    interactions,
                )
            })
            .collect()
    }

    pub fn score(
        &self,
        product: &Product,
        scenario: Scenario,
        competitor_avg: f64,
        time_multiplier: f64,
        demand: &DemandPrediction,
    ) -> ScenarioEvaluation {
        let price = scenario.price;
        let expected_sales = BASE_CONVERSION_RATE * (demand.demand_score / 100.0) * time_multiplier;
        let expected_revenue = price * expected_sales;
        let expected_profit = (price - product.base_cost) * expected_sales;
        let margin_percent = product.margin_percent_at(price);
        let competitiveness_score = if competitor_avg > 0.0 {
            (100.0 - ((price - competitor_avg) / competitor_avg * 100.0).abs()).max(0.0)
        } else {
            NEUTRAL_COMPETITIVENESS
        };

        let weights = self.weights;
        let score = weights.profit * expected_profit
            + weights.competitiveness * competitiveness_score
            + weights.demand * demand.demand_score
            + weights.margin * margin_percent;

        ScenarioEvaluation {
            scenario,
            demand_score: demand.demand_score,
            confidence: demand.confidence,
            expected_sales,
            expected_revenue,
            expected_profit,
            margin_percent,
            competitiveness_score,
            score,
        }
    }
}
