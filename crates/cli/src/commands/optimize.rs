use std::sync::Arc;

use pricewise_core::clock::{Clock, SystemClock};
use pricewise_core::config::AppConfig;
use pricewise_core::demand::{select_demand_model, DemandEstimator};
use pricewise_core::domain::product::ProductId;
use pricewise_core::events::EventBus;
use pricewise_core::pricing::{PriceSelector, PricingEngine, PricingError, Selection};
use pricewise_core::store::{SharedStore, StoreError};
use pricewise_db::SqlMarketStore;

use crate::commands::{build_runtime, load_config, open_database, CommandFailure, CommandResult};

/// Runs one optimization pass, over the whole catalog or a single product.
pub fn run(product: Option<String>) -> CommandResult {
    let config = match load_config("optimize") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("optimize") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let store: SharedStore = Arc::new(SqlMarketStore::new(pool.clone()));
        let engine = build_engine(&config, store);

        let outcome = match product {
            Some(id) => optimize_one(&engine, ProductId(id)).await,
            None => engine
                .optimize_catalog()
                .await
                .map(|report| {
                    format!(
                        "optimization pass completed: evaluated={} committed={} unchanged={} failed={}",
                        report.evaluated, report.committed, report.unchanged, report.failed
                    )
                })
                .map_err(|error| ("optimization", error.to_string(), 7u8)),
        };

        pool.close().await;
        outcome
    });

    match result {
        Ok(message) => CommandResult::success("optimize", message),
        Err(failure) => CommandResult::from_failure("optimize", failure),
    }
}

fn build_engine(config: &AppConfig, store: SharedStore) -> PricingEngine {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let estimator = DemandEstimator::new(
        Arc::clone(&store),
        select_demand_model(config.demand.model_path.as_deref()),
        Arc::clone(&clock),
        config.demand.interaction_window(),
    );

    PricingEngine::new(store, estimator, EventBus::default(), clock)
        .with_selector(PriceSelector::new(config.pricing.change_threshold))
        .with_competitor_sample_size(config.pricing.competitor_sample_size)
}

async fn optimize_one(engine: &PricingEngine, id: ProductId) -> Result<String, CommandFailure> {
    match engine.optimize_product(&id).await {
        Ok(selection) => Ok(describe_selection(&id, &selection)),
        Err(PricingError::Store(StoreError::ProductNotFound(_))) => {
            Err(("not_found", format!("product not found: {id}"), 8u8))
        }
        Err(error) => Err(("optimization", error.to_string(), 7u8)),
    }
}

fn describe_selection(id: &ProductId, selection: &Selection) -> String {
    match selection {
        Selection::NoFeasibleScenario => {
            format!("{id}: no candidate keeps the margin floor; price unchanged")
        }
        Selection::BelowThreshold { best } => format!(
            "{id}: best candidate {} at {:.2} is within the change threshold; price unchanged",
            best.scenario.strategy, best.scenario.price
        ),
        Selection::Unroundable { best } => format!(
            "{id}: no cent price near {:.2} ({}) satisfies bounds and margin; price unchanged",
            best.scenario.price, best.scenario.strategy
        ),
        Selection::Commit(decision) => format!(
            "{id}: {:.2} -> {:.2} ({:+.2}%) via {}",
            decision.old_price,
            decision.new_price,
            decision.change_percent(),
            decision.evaluation.scenario.strategy
        ),
    }
}
