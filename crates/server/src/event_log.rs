use pricewise_core::events::{EventBus, MarketEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Mirrors every bus event into the log until the bus is dropped.
pub fn spawn(events: &EventBus) -> JoinHandle<()> {
    let mut receiver = events.subscribe();

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        event_name = "system.event_log.lagged",
                        skipped,
                        "event log subscriber fell behind; events dropped"
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &MarketEvent) {
    match event {
        MarketEvent::PriceChange(change) => info!(
            event_name = "market.price_change",
            product_id = %change.product_id,
            old_price = change.old_price,
            new_price = change.new_price,
            change_percent = change.change,
            strategy = %change.strategy,
            "price changed"
        ),
        MarketEvent::Purchase(purchase) => info!(
            event_name = "market.purchase",
            product_id = %purchase.product_id,
            quantity = purchase.quantity,
            revenue = purchase.revenue,
            remaining_stock = purchase.remaining_stock,
            "purchase completed"
        ),
        MarketEvent::CustomerInteraction(interaction) => debug!(
            event_name = "market.customer_interaction",
            product_id = %interaction.product_id,
            interaction_type = %interaction.interaction_type,
            session_id = %interaction.session_id,
            "customer interaction"
        ),
        MarketEvent::CompetitorUpdate { timestamp } => debug!(
            event_name = "market.competitor_update",
            timestamp = %timestamp,
            "competitor prices refreshed"
        ),
    }
}
