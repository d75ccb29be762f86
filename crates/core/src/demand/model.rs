//! Demand scoring strategies
//!
//! Both strategies consume the same normalized feature vector and return a
//! score in `[0, 1]`. The statistical model is always available; the linear
//! model is only used when a weights file is configured and loads cleanly.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::features::{NormalizedFeatures, FEATURE_DIM};

pub trait DemandModel: Send + Sync {
    fn name(&self) -> &str;

    /// Demand proxy in `[0, 1]`.
    fn score(&self, features: &NormalizedFeatures) -> f64;
}

#[derive(Debug, Error)]
pub enum DemandModelError {
    #[error("failed to read demand model `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse demand model: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("expected {expected} weights, got {actual}")]
    Dimension { expected: usize, actual: usize },
    #[error("demand model contains non-finite coefficients")]
    NonFinite,
}

/// Deterministic weighted blend of the features, bounded to `[0.1, 0.9]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatisticalDemandModel;

impl StatisticalDemandModel {
    pub const FLOOR: f64 = 0.1;
    pub const CEILING: f64 = 0.9;
}

impl DemandModel for StatisticalDemandModel {
    fn name(&self) -> &str {
        "statistical"
    }

    fn score(&self, features: &NormalizedFeatures) -> f64 {
        // lower price position and lower price-vs-market both raise demand
        let price = (1.0 - features.price_position) * 0.25;
        let stock = features.stock_ratio * 0.15;
        let competitive = ((2.0 - features.competitiveness) / 2.0).max(0.0) * 0.25;
        let margin = features.margin_ratio * 0.05;
        let time = features.time_multiplier * 0.15;
        let interaction = features.interaction_score * 0.15;

        (price + stock + competitive + margin + time + interaction).clamp(Self::FLOOR, Self::CEILING)
    }
}

#[derive(Deserialize)]
struct LinearModelFile {
    version: String,
    bias: f64,
    weights: Vec<f64>,
}

/// Logistic regression over the normalized features, loaded from JSON:
/// `{"version": "...", "bias": 0.0, "weights": [8 numbers]}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinearDemandModel {
    pub version: String,
    pub bias: f64,
    pub weights: [f64; FEATURE_DIM],
}

impl LinearDemandModel {
    pub fn new(
        version: impl Into<String>,
        bias: f64,
        weights: Vec<f64>,
    ) -> Result<Self, DemandModelError> {
        let actual = weights.len();
        let weights: [f64; FEATURE_DIM] = weights
            .try_into()
            .map_err(|_| DemandModelError::Dimension { expected: FEATURE_DIM, actual })?;
        if !bias.is_finite() || weights.iter().any(|weight| !weight.is_finite()) {
            return Err(DemandModelError::NonFinite);
        }
        Ok(Self { version: version.into(), bias, weights })
    }

    pub fn from_json_str(json: &str) -> Result<Self, DemandModelError> {
        let file: LinearModelFile = serde_json::from_str(json)?;
        Self::new(file.version, file.bias, file.weights)
    }

    pub fn load(path: &Path) -> Result<Self, DemandModelError> {
        let json = std::fs::read_to_string(path).map_err(|source| DemandModelError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    fn sigmoid(z: f64) -> f64 {
        let z = z.clamp(-500.0, 500.0);
        1.0 / (1.0 + (-z).exp())
    }
}

impl DemandModel for LinearDemandModel {
    fn name(&self) -> &str {
        "linear"
    }

    fn score(&self, features: &NormalizedFeatures) -> f64 {
        let z: f64 = self.bias
            + self.weights.iter().zip(features.to_vector()).map(|(w, x)| w * x).sum::<f64>();
        Self::sigmoid(z)
    }
}

/// Capability probe run once at startup.
///
/// Returns the linear model when `model_path` names a loadable weights file and
/// the statistical model otherwise. Load failures are logged, never returned.
pub fn select_demand_model(model_path: Option<&Path>) -> Arc<dyn DemandModel> {
    let Some(path) = model_path else {
        info!(
            event_name = "demand.model.selected",
            model = "statistical",
            "no demand model configured; using statistical scoring"
        );
        return Arc::new(StatisticalDemandModel);
    };

    match LinearDemandModel::load(path) {
        Ok(model) => {
            info!(
                event_name = "demand.model.selected",
                model = "linear",
                version = %model.version,
                path = %path.display(),
                "loaded linear demand model"
            );
            Arc::new(model)
        }
        Err(error) => {
            warn!(
                event_name = "demand.model.fallback",
                path = %path.display(),
                error = %error,
                "demand model unavailable; using statistical scoring"
            );
            Arc::new(StatisticalDemandModel)
        }
    }
}
