pub mod analytics;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod demand;
pub mod domain;
pub mod errors;
pub mod events;
pub mod pricing;
pub mod schedule;
pub mod scheduler;
pub mod simulation;
pub mod store;

pub use analytics::{CategoryPerformance, DashboardSnapshot};
pub use catalog::{seed_catalog, starter_products, CatalogEntry, STARTER_CATALOG};
pub use clock::{Clock, ManualClock, SystemClock};
pub use demand::{select_demand_model, DemandEstimator, DemandModel, DemandPrediction};
pub use domain::market::{
    CompetitorObservation, InteractionRecord, InteractionSummary, InteractionType,
    PriceHistoryRecord, SaleOutcome, SaleRecord, SalesSummary,
};
pub use domain::product::{Product, ProductId};
pub use errors::{ApplicationError, DomainError};
pub use events::{EventBus, MarketEvent};
pub use pricing::{PassReport, PriceSelector, PricingEngine, PricingError, Selection, Strategy};
pub use schedule::{Cadence, PeriodicTask, TaskHandle};
pub use scheduler::{OptimizationScheduler, SchedulerState};
pub use simulation::{MarketSimulator, SimulationSettings};
pub use store::{InMemoryMarketStore, MarketStore, SharedStore, StoreError};
