//! Synthetic market activity
//!
//! Three independent generators, each on its own jittered timer: shopper
//! interactions, purchases, and competitor repricing sweeps. Writes are
//! best-effort; a failed write is logged at debug and dropped.

pub mod generators;
pub mod sampling;
pub mod sessions;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Duration;
use tracing::info;

use crate::clock::Clock;
use crate::events::EventBus;
use crate::schedule::{spawn_periodic, task_rng, Cadence, TaskHandle};
use crate::store::SharedStore;

pub use generators::{
    CompetitorUpdater, InteractionGenerator, MarketContext, PurchaseAttempt, PurchaseGenerator,
};
pub use sessions::SessionPool;

pub const DEFAULT_COMPETITORS: [&str; 5] =
    ["CompeteShop", "MarketLeader", "PriceKing", "ValueMart", "TechDeals"];

pub const INTERACTION_CADENCE: Cadence = Cadence::from_millis(2_000, 3_000);
pub const PURCHASE_CADENCE: Cadence = Cadence::from_millis(5_000, 10_000);
pub const COMPETITOR_CADENCE: Cadence = Cadence::from_millis(10_000, 10_000);

#[derive(Clone, Debug)]
pub struct SimulationSettings {
    pub seed: Option<u64>,
    pub competitors: Vec<String>,
    pub session_capacity: usize,
    pub session_ttl: Duration,
    pub interaction_cadence: Cadence,
    pub purchase_cadence: Cadence,
    pub competitor_cadence: Cadence,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: None,
            competitors: DEFAULT_COMPETITORS.iter().map(|name| name.to_string()).collect(),
            session_capacity: sessions::DEFAULT_SESSION_CAPACITY,
            session_ttl: Duration::seconds(sessions::DEFAULT_SESSION_TTL_SECS),
            interaction_cadence: INTERACTION_CADENCE,
            purchase_cadence: PURCHASE_CADENCE,
            competitor_cadence: COMPETITOR_CADENCE,
        }
    }
}

pub struct MarketSimulator {
    context: MarketContext,
    settings: SimulationSettings,
    tasks: Mutex<Vec<TaskHandle>>,
}

impl MarketSimulator {
    pub fn new(
        store: SharedStore,
        events: EventBus,
        clock: Arc<dyn Clock>,
        settings: SimulationSettings,
    ) -> Self {
        Self {
            context: MarketContext { store, events, clock },
            settings,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|task| !task.is_finished())
    }

    /// Spawns the three generators. Returns `false` when already running.
    pub fn start(&self) -> bool {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.iter().any(|task| !task.is_finished()) {
            return false;
        }
        tasks.clear();

        let seed = self.settings.seed;
        let sessions = SessionPool::new(self.settings.session_capacity, self.settings.session_ttl);
        tasks.push(spawn_periodic(
            InteractionGenerator::new(self.context.clone(), sessions, task_rng(seed, 1)),
            None,
            self.settings.interaction_cadence,
            task_rng(seed, 11),
        ));
        tasks.push(spawn_periodic(
            PurchaseGenerator::new(self.context.clone(), task_rng(seed, 2)),
            None,
            self.settings.purchase_cadence,
            task_rng(seed, 12),
        ));
        tasks.push(spawn_periodic(
            CompetitorUpdater::new(
                self.context.clone(),
                self.settings.competitors.clone(),
                task_rng(seed, 3),
            ),
            None,
            self.settings.competitor_cadence,
            task_rng(seed, 13),
        ));

        info!(
            event_name = "simulation.started",
            competitors = self.settings.competitors.len(),
            seeded = seed.is_some(),
            "market simulation started"
        );
        true
    }

    /// Cancels all pending timers. Returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        let tasks = self.take_tasks();
        if tasks.is_empty() {
            return false;
        }
        tasks.iter().for_each(TaskHandle::stop);
        info!(event_name = "simulation.stopped", "market simulation stopped");
        true
    }

    pub async fn stop_and_wait(&self) -> bool {
        let tasks = self.take_tasks();
        if tasks.is_empty() {
            return false;
        }
        for task in tasks {
            task.stop_and_join().await;
        }
        info!(event_name = "simulation.stopped", "market simulation stopped");
        true
    }

    fn take_tasks(&self) -> Vec<TaskHandle> {
        std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::{MarketSimulator, SimulationSettings};
    use crate::clock::ManualClock;
    use crate::domain::product::{Product, ProductId};
    use crate::events::EventBus;
    use crate::store::InMemoryMarketStore;

    fn product() -> Product {
        Product {
            id: ProductId("prod-006".to_string()),
            name: "Wireless Mouse Ergonomic".to_string(),
            category: "Accessories".to_string(),
            base_cost: 18.0,
            current_price: 44.99,
            stock_level: 180,
            initial_stock: 180,
            min_price: 24.3,
            max_price: 67.485,
            min_margin_percent: 35.0,
        }
    }

    fn simulator(store: Arc<InMemoryMarketStore>) -> MarketSimulator {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).single().expect("timestamp"),
        ));
        MarketSimulator::new(
            store,
            EventBus::new(256),
            clock,
            SimulationSettings { seed: Some(42), ..SimulationSettings::default() },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn generators_fill_the_store_on_their_timers() {
        let store = Arc::new(InMemoryMarketStore::with_products([product()]));
        let simulator = simulator(store.clone());

        assert!(simulator.start());
        assert!(!simulator.start());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(simulator.stop_and_wait().await);

        // at most 5 s per interaction and 20 s per sweep
        assert!(store.interactions().await.len() >= 12);
        assert!(!simulator.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_generated_after_stop() {
        let store = Arc::new(InMemoryMarketStore::with_products([product()]));
        let simulator = simulator(store.clone());
        simulator.start();

        assert!(simulator.stop());
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(store.interactions().await.is_empty());
        assert!(store.sales().await.is_empty());
        assert!(store.competitor_prices().await.is_empty());
        assert!(!simulator.stop());
    }
}
