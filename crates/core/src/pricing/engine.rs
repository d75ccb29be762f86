use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::evaluator::ScenarioEvaluator;
use super::scenario::generate_scenarios;
use super::selector::{PriceDecision, PriceSelector, Selection};
use crate::clock::Clock;
use crate::demand::{time_multiplier, DemandEstimator};
use crate::domain::market::PriceHistoryRecord;
use crate::domain::product::{Product, ProductId};
use crate::events::{EventBus, MarketEvent, PriceChangeEvent};
use crate::store::{SharedStore, StoreError};

pub const DEFAULT_COMPETITOR_SAMPLE_SIZE: usize = 15;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counts for one full-catalog pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub evaluated: usize,
    pub committed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

pub struct PricingEngine {
    store: SharedStore,
    estimator: DemandEstimator,
    evaluator: ScenarioEvaluator,
    selector: PriceSelector,
    events: EventBus,
    clock: Arc<dyn Clock>,
    competitor_sample_size: usize,
}

impl PricingEngine {
    pub fn new(
        store: SharedStore,
        estimator: DemandEstimator,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            estimator,
            evaluator: ScenarioEvaluator::default(),
            selector: PriceSelector::default(),
            events,
            clock,
            competitor_sample_size: DEFAULT_COMPETITOR_SAMPLE_SIZE,
        }
    }

    pub fn with_evaluator(mut self, evaluator: ScenarioEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_selector(mut self, selector: PriceSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_competitor_sample_size(mut self, sample_size: usize) -> Self {
        self.competitor_sample_size = sample_size.max(1);
        self
    }

    pub fn estimator(&self) -> &DemandEstimator {
        &self.estimator
    }

    /// Runs every product through the optimizer in id order.
    ///
    /// A failure on one product is logged and counted; the pass moves on.
    pub async fn optimize_catalog(&self) -> Result<PassReport, PricingError> {
        let products = self.store.list_products().await?;
        let mut report = PassReport::default();

        for product in products {
            report.evaluated += 1;
            match self.optimize_product(&product.id).await {
                Ok(Selection::Commit(_)) => report.committed += 1,
                Ok(_) => report.unchanged += 1,
                Err(error) => {
                    report.failed += 1;
                    warn!(
                        event_name = "pricing.product.failed",
                        product_id = %product.id,
                        error = %error,
                        "price optimization failed for product"
                    );
                }
            }
        }

        info!(
            event_name = "pricing.pass.completed",
            evaluated = report.evaluated,
            committed = report.committed,
            unchanged = report.unchanged,
            failed = report.failed,
            "optimization pass completed"
        );
        Ok(report)
    }

    /// Evaluates one product against fresh market signals and commits the
    /// selected price when it clears the change threshold.
    pub async fn optimize_product(&self, product_id: &ProductId) -> Result<Selection, PricingError> {
        let product = self.store.get_product(product_id).await?;
        let competitor_avg = self
            .store
            .recent_competitor_average(product_id, self.competitor_sample_size)
            .await?
            .unwrap_or(0.0);
        let multiplier = time_multiplier(self.clock.local_now());
        let interactions = self.estimator.recent_interactions(product_id).await?;

        let current =
            self.estimator.predict_with(&product, competitor_avg, multiplier, &interactions);
        let scenarios = generate_scenarios(&product, competitor_avg);
        let evaluations = self.evaluator.evaluate_all(
            &self.estimator,
            &product,
            &scenarios,
            competitor_avg,
            multiplier,
            &interactions,
        );
        let selection = self.selector.decide(&product, &evaluations);

        debug!(
            event_name = "pricing.product.evaluated",
            product_id = %product.id,
            current_demand = current.demand_score,
            confidence = current.confidence,
            competitor_avg,
            time_multiplier = multiplier,
            scenarios = evaluations.len(),
            "product evaluated"
        );

        if let Selection::Commit(decision) = &selection {
            self.commit(&product, decision, competitor_avg).await?;
        }
        Ok(selection)
    }

    async fn commit(
        &self,
        product: &Product,
        decision: &PriceDecision,
        competitor_avg: f64,
    ) -> Result<(), PricingError> {
        let timestamp = self.clock.now();
        let strategy = decision.evaluation.scenario.strategy;
        let reason = strategy.reason(product);

        self.store
            .apply_price_change(PriceHistoryRecord {
                product_id: product.id.clone(),
                old_price: decision.old_price,
                new_price: decision.new_price,
                reason: reason.clone(),
                demand_score: decision.evaluation.demand_score,
                competitor_avg,
                stock_level: product.stock_level,
                timestamp,
            })
            .await?;

        self.events.publish(MarketEvent::PriceChange(PriceChangeEvent {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            old_price: decision.old_price,
            new_price: decision.new_price,
            change: (decision.change_percent() * 100.0).round() / 100.0,
            reason,
            strategy: strategy.as_str().to_string(),
            demand: decision.evaluation.demand_score,
            expected_profit: decision.evaluation.expected_profit,
            timestamp,
        }));

        info!(
            event_name = "pricing.price_changed",
            product_id = %product.id,
            old_price = decision.old_price,
            new_price = decision.new_price,
            strategy = strategy.as_str(),
            "price updated"
        );
        Ok(())
    }
}
