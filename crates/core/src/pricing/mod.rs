//! Price optimization
//!
//! One optimization step per product: generate candidate prices, score each
//! one against re-estimated demand, keep the best candidate that holds the
//! margin floor, and commit it when it moves the price far enough.

pub mod engine;
pub mod evaluator;
pub mod scenario;
pub mod selector;

pub use engine::{PassReport, PricingEngine, PricingError, DEFAULT_COMPETITOR_SAMPLE_SIZE};
pub use evaluator::{EvaluationWeights, ScenarioEvaluation, ScenarioEvaluator};
pub use scenario::{generate_scenarios, Scenario, Strategy};
pub use selector::{round_for_commit, PriceDecision, PriceSelector, Selection};
