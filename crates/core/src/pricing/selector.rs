use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::evaluator::ScenarioEvaluation;
use crate::domain::product::Product;

/// Minimum absolute price move, in currency units, before a change is committed.
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.5;

const CENT_PLACES: u32 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceDecision {
    pub evaluation: ScenarioEvaluation,
    pub old_price: f64,
    /// Rounded to cents; always inside the product bounds and above the margin floor.
    pub new_price: f64,
}

impl PriceDecision {
    pub fn change_percent(&self) -> f64 {
        if self.old_price == 0.0 {
            return 0.0;
        }
        (self.new_price - self.old_price) / self.old_price * 100.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// No candidate keeps the margin floor.
    NoFeasibleScenario,
    /// The best candidate is too close to the current price.
    BelowThreshold { best: ScenarioEvaluation },
    /// No cent value near the best candidate satisfies both bounds and margin.
    Unroundable { best: ScenarioEvaluation },
    Commit(PriceDecision),
}

#[derive(Clone, Copy, Debug)]
pub struct PriceSelector {
    change_threshold: f64,
}

impl Default for PriceSelector {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_THRESHOLD)
    }
}

impl PriceSelector {
    pub fn new(change_threshold: f64) -> Self {
        Self { change_threshold }
    }

    pub fn change_threshold(&self) -> f64 {
        self.change_threshold
    }

    /// Highest-scoring candidate that keeps the margin floor. The first of
    /// equally scored candidates wins.
    pub fn select_best<'a>(
        &self,
        product: &Product,
        evaluations: &'a [ScenarioEvaluation],
    ) -> Option<&'a ScenarioEvaluation> {
        evaluations.iter().filter(|evaluation| evaluation.meets_margin_floor(product)).fold(
            None,
            |best: Option<&ScenarioEvaluation>, candidate| match best {
                Some(current) if candidate.score > current.score => Some(candidate),
                Some(current) => Some(current),
                None => Some(candidate),
            },
        )
    }

    pub fn decide(&self, product: &Product, evaluations: &[ScenarioEvaluation]) -> Selection {
        let Some(best) = self.select_best(product, evaluations) else {
            return Selection::NoFeasibleScenario;
        };

        if (best.scenario.price - product.current_price).abs() <= self.change_threshold {
            return Selection::BelowThreshold { best: best.clone() };
        }

        match round_for_commit(best.scenario.price, product) {
            Some(new_price) if new_price == product.current_price => {
                Selection::BelowThreshold { best: best.clone() }
            }
            Some(new_price) => Selection::Commit(PriceDecision {
                evaluation: best.clone(),
                old_price: product.current_price,
                new_price,
            }),
            None => Selection::Unroundable { best: best.clone() },
        }
    }
}

/// Rounds a selected price to cents without leaving the feasible region.
///
/// Half-cents round away from zero. A result past a bound is rounded inward,
/// and a result that slips under the margin floor moves up one cent. `None`
/// when no cent value near `raw` is feasible.
pub fn round_for_commit(raw: f64, product: &Product) -> Option<f64> {
    let min = Decimal::from_f64(product.min_price)?
        .round_dp_with_strategy(CENT_PLACES, RoundingStrategy::ToPositiveInfinity);
    let max = Decimal::from_f64(product.max_price)?
        .round_dp_with_strategy(CENT_PLACES, RoundingStrategy::ToNegativeInfinity);
    if min > max {
        return None;
    }
    let mut cents = Decimal::from_f64(raw)?
        .round_dp_with_strategy(CENT_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .clamp(min, max);

    if !feasible(cents, product) {
        cents += Decimal::new(1, CENT_PLACES);
    }
    if cents > max || !feasible(cents, product) {
        return None;
    }
    cents.to_f64()
}

fn feasible(cents: Decimal, product: &Product) -> bool {
    cents.to_f64().is_some_and(|price| {
        product.contains_price(price)
            && product.margin_percent_at(price) >= product.min_margin_percent
    })
}
