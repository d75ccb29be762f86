use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use super::sampling::{
    competitor_quote, draw_interaction_type, draw_quantity, purchase_probability,
    purchase_weight, visibility_weight, weighted_pick,
};
use super::sessions::SessionPool;
use crate::clock::Clock;
use crate::domain::market::{CompetitorObservation, InteractionRecord, SaleOutcome, SaleRecord};
use crate::domain::product::{Product, ProductId};
use crate::events::{EventBus, InteractionEvent, MarketEvent, PurchaseEvent};
use crate::schedule::PeriodicTask;
use crate::store::{SharedStore, StoreError};

const COMPETITOR_UPDATE_PROBABILITY: f64 = 0.3;

/// Store, event bus, and clock shared by every generator.
#[derive(Clone)]
pub struct MarketContext {
    pub store: SharedStore,
    pub events: EventBus,
    pub clock: Arc<dyn Clock>,
}

pub struct InteractionGenerator {
    context: MarketContext,
    sessions: SessionPool,
    rng: StdRng,
}

impl InteractionGenerator {
    pub fn new(context: MarketContext, sessions: SessionPool, rng: StdRng) -> Self {
        Self { context, sessions, rng }
    }

    /// Records one synthetic interaction on a traffic-weighted product.
    pub async fn generate(&mut self) -> Result<Option<InteractionRecord>, StoreError> {
        let products = self.context.store.list_products().await?;
        let weights: Vec<f64> = products.iter().map(visibility_weight).collect();
        let Some(product) = weighted_pick(&mut self.rng, &products, &weights) else {
            return Ok(None);
        };

        let now = self.context.clock.now();
        let record = InteractionRecord {
            product_id: product.id.clone(),
            interaction_type: draw_interaction_type(&mut self.rng),
            session_id: self.sessions.resolve(now, &mut self.rng),
            price_at_interaction: product.current_price,
            timestamp: now,
        };
        self.context.store.record_interaction(record.clone()).await?;

        self.context.events.publish(MarketEvent::CustomerInteraction(InteractionEvent {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            interaction_type: record.interaction_type,
            session_id: record.session_id.clone(),
            price: record.price_at_interaction,
            timestamp: now,
        }));
        Ok(Some(record))
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl PeriodicTask for InteractionGenerator {
    fn name(&self) -> &'static str {
        "simulation.interactions"
    }

    async fn run_once(&mut self) {
        if let Err(error) = self.generate().await {
            debug!(
                event_name = "simulation.write.dropped",
                generator = self.name(),
                error = %error,
                "dropped simulated interaction"
            );
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PurchaseAttempt {
    /// Nothing in stock anywhere.
    NoStock,
    /// The shopper looked and walked away.
    Declined { product_id: ProductId },
    InsufficientStock { product_id: ProductId, requested: u32, available: u32 },
    Completed { sale: SaleRecord, remaining_stock: u32 },
}

pub struct PurchaseGenerator {
    context: MarketContext,
    rng: StdRng,
}

impl PurchaseGenerator {
    pub fn new(context: MarketContext, rng: StdRng) -> Self {
        Self { context, rng }
    }

    pub async fn generate(&mut self) -> Result<PurchaseAttempt, StoreError> {
        let products: Vec<Product> = self
            .context
            .store
            .list_products()
            .await?
            .into_iter()
            .filter(|product| product.stock_level > 0)
            .collect();
        let weights: Vec<f64> = products.iter().map(purchase_weight).collect();
        let Some(product) = weighted_pick(&mut self.rng, &products, &weights) else {
            return Ok(PurchaseAttempt::NoStock);
        };

        if !self.rng.gen_bool(purchase_probability(product)) {
            return Ok(PurchaseAttempt::Declined { product_id: product.id.clone() });
        }

        let quantity = draw_quantity(&mut self.rng);
        if product.stock_level < quantity {
            return Ok(PurchaseAttempt::InsufficientStock {
                product_id: product.id.clone(),
                requested: quantity,
                available: product.stock_level,
            });
        }

        let sale = SaleRecord::at_current_price(product, quantity, self.context.clock.now());
        match self.context.store.record_sale(sale.clone()).await? {
            SaleOutcome::Recorded { remaining_stock } => {
                self.context.events.publish(MarketEvent::Purchase(PurchaseEvent {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    quantity,
                    price: sale.price,
                    revenue: sale.revenue,
                    profit: sale.profit,
                    remaining_stock,
                    timestamp: sale.timestamp,
                }));
                Ok(PurchaseAttempt::Completed { sale, remaining_stock })
            }
            // stock moved between the read and the conditional decrement
            SaleOutcome::InsufficientStock { available } => {
                Ok(PurchaseAttempt::InsufficientStock {
                    product_id: product.id.clone(),
                    requested: quantity,
                    available,
                })
            }
        }
    }
}

#[async_trait]
impl PeriodicTask for PurchaseGenerator {
    fn name(&self) -> &'static str {
        "simulation.purchases"
    }

    async fn run_once(&mut self) {
        if let Err(error) = self.generate().await {
            debug!(
                event_name = "simulation.write.dropped",
                generator = self.name(),
                error = %error,
                "dropped simulated purchase"
            );
        }
    }
}

pub struct CompetitorUpdater {
    context: MarketContext,
    competitors: Vec<String>,
    rng: StdRng,
}

impl CompetitorUpdater {
    pub fn new(context: MarketContext, competitors: Vec<String>, rng: StdRng) -> Self {
        Self { context, competitors, rng }
    }

    /// Each competitor independently reprices each product with probability
    /// 0.3. Emits one summary event per sweep and returns how many
    /// observations were stored.
    pub async fn sweep(&mut self) -> Result<usize, StoreError> {
        let products = self.context.store.list_products().await?;
        let now = self.context.clock.now();
        let mut recorded = 0;

        for product in &products {
            for competitor in &self.competitors {
                if !self.rng.gen_bool(COMPETITOR_UPDATE_PROBABILITY) {
                    continue;
                }
                let observation = CompetitorObservation {
                    product_id: product.id.clone(),
                    competitor_name: competitor.clone(),
                    price: competitor_quote(&mut self.rng, product.current_price),
                    timestamp: now,
                };
                match self.context.store.record_competitor_price(observation).await {
                    Ok(()) => recorded += 1,
                    Err(error) => debug!(
                        event_name = "simulation.write.dropped",
                        generator = "simulation.competitors",
                        product_id = %product.id,
                        competitor = %competitor,
                        error = %error,
                        "dropped competitor observation"
                    ),
                }
            }
        }

        self.context.events.publish(MarketEvent::CompetitorUpdate { timestamp: now });
        Ok(recorded)
    }
}

#[async_trait]
impl PeriodicTask for CompetitorUpdater {
    fn name(&self) -> &'static str {
        "simulation.competitors"
    }

    async fn run_once(&mut self) {
        if let Err(error) = self.sweep().await {
            debug!(
                event_name = "simulation.write.dropped",
                generator = self.name(),
                error = %error,
                "dropped competitor sweep"
            );
        }
    }
}
