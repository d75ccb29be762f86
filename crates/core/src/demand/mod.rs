//! Demand estimation
//!
//! Turns a product and its market signals into a demand score and a
//! confidence, both on a 0-100 scale. Scoring is delegated to a
//! [`DemandModel`] chosen once at startup by [`select_demand_model`].

pub mod features;
pub mod model;
pub mod time;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::domain::market::InteractionSummary;
use crate::domain::product::{Product, ProductId};
use crate::store::{SharedStore, StoreError};

pub use features::{NormalizedFeatures, RawFeatures, FEATURE_DIM};
pub use model::{
    select_demand_model, DemandModel, DemandModelError, LinearDemandModel, StatisticalDemandModel,
};
pub use time::time_multiplier;

pub const DEFAULT_INTERACTION_WINDOW_SECS: u64 = 300;

const BASE_CONFIDENCE: f64 = 0.5;
const CONFIDENCE_PER_INTERACTION: f64 = 1.0 / 20.0;
const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandPrediction {
    /// 0-100
    pub demand_score: f64,
    /// 0-100, grows with the number of recent interactions
    pub confidence: f64,
    pub features: NormalizedFeatures,
    pub model: String,
}

pub struct DemandEstimator {
    store: SharedStore,
    model: Arc<dyn DemandModel>,
    clock: Arc<dyn Clock>,
    interaction_window: chrono::Duration,
}

impl DemandEstimator {
    pub fn new(
        store: SharedStore,
        model: Arc<dyn DemandModel>,
        clock: Arc<dyn Clock>,
        interaction_window: std::time::Duration,
    ) -> Self {
        let interaction_window = chrono::Duration::from_std(interaction_window)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_INTERACTION_WINDOW_SECS as i64));
        Self { store, model, clock, interaction_window }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Interaction counts for the product inside the trailing window.
    pub async fn recent_interactions(
        &self,
        product_id: &ProductId,
    ) -> Result<InteractionSummary, StoreError> {
        let since = self.clock.now() - self.interaction_window;
        self.store.interaction_summary(Some(product_id), since).await
    }

    pub async fn predict(
        &self,
        product: &Product,
        competitor_avg: f64,
        time_multiplier: f64,
    ) -> Result<DemandPrediction, StoreError> {
        let interactions = self.recent_interactions(&product.id).await?;
        Ok(self.predict_with(product, competitor_avg, time_multiplier, &interactions))
    }

    /// Pure scoring step: identical inputs always give the identical prediction.
    pub fn predict_with(
        &self,
        product: &Product,
        competitor_avg: f64,
        time_multiplier: f64,
        interactions: &InteractionSummary,
    ) -> DemandPrediction {
        let features =
            RawFeatures::extract(product, competitor_avg, time_multiplier, interactions).normalize();
        let score = self.model.score(&features).clamp(0.0, 1.0);

        DemandPrediction {
            demand_score: score * 100.0,
            confidence: confidence(interactions.total()) * 100.0,
            features,
            model: self.model.name().to_string(),
        }
    }
}

fn confidence(interaction_count: u32) -> f64 {
    (BASE_CONFIDENCE + f64::from(interaction_count) * CONFIDENCE_PER_INTERACTION).min(MAX_CONFIDENCE)
}
