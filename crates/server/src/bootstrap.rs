use std::sync::Arc;

use pricewise_core::clock::{Clock, SystemClock};
use pricewise_core::config::{AppConfig, ConfigError, LoadOptions};
use pricewise_core::demand::{select_demand_model, DemandEstimator};
use pricewise_core::errors::ApplicationError;
use pricewise_core::events::EventBus;
use pricewise_core::pricing::{PriceSelector, PricingEngine};
use pricewise_core::scheduler::OptimizationScheduler;
use pricewise_core::simulation::MarketSimulator;
use pricewise_core::store::SharedStore;
use pricewise_db::{connect_with_settings, migrations, CatalogSeed, DbPool, SqlMarketStore};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub store: SharedStore,
    pub events: EventBus,
    pub engine: Arc<PricingEngine>,
    pub simulator: MarketSimulator,
    pub scheduler: Arc<OptimizationScheduler>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("catalog seed failed: {0}")]
    Seed(#[source] ApplicationError),
}

#[cfg(test)]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects, migrates, seeds and wires the pricing runtime. Nothing is started.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let store: SharedStore = Arc::new(SqlMarketStore::new(db_pool.clone()));
    let seed = CatalogSeed::load(store.as_ref()).await.map_err(BootstrapError::Seed)?;
    info!(
        event_name = "system.bootstrap.catalog_ready",
        inserted = seed.inserted,
        already_seeded = seed.already_seeded,
        "catalog ready"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let events = EventBus::default();
    let model = select_demand_model(config.demand.model_path.as_deref());
    let estimator = DemandEstimator::new(
        Arc::clone(&store),
        model,
        Arc::clone(&clock),
        config.demand.interaction_window(),
    );

    let engine = Arc::new(
        PricingEngine::new(Arc::clone(&store), estimator, events.clone(), Arc::clone(&clock))
            .with_selector(PriceSelector::new(config.pricing.change_threshold))
            .with_competitor_sample_size(config.pricing.competitor_sample_size),
    );
    let scheduler = Arc::new(
        OptimizationScheduler::new(Arc::clone(&engine))
            .with_timing(config.pricing.warmup(), config.pricing.cadence())
            .with_seed(config.simulation.seed),
    );
    let simulator = MarketSimulator::new(
        Arc::clone(&store),
        events.clone(),
        clock,
        config.simulation.settings(),
    );

    info!(
        event_name = "system.bootstrap.ready",
        demand_model = engine.estimator().model_name(),
        simulation_enabled = config.simulation.enabled,
        "pricing runtime wired"
    );

    Ok(Application { config, db_pool, store, events, engine, simulator, scheduler })
}
