use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::market::InteractionType;
use crate::domain::product::ProductId;

pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Serialized as `{"event": <kind>, "data": <payload>}` so payload fields
/// such as an interaction's `type` never collide with the event name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum MarketEvent {
    PriceChange(PriceChangeEvent),
    Purchase(PurchaseEvent),
    CustomerInteraction(InteractionEvent),
    CompetitorUpdate {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PriceChange(_) => "price_change",
            Self::Purchase(_) => "purchase",
            Self::CustomerInteraction(_) => "customer_interaction",
            Self::CompetitorUpdate { .. } => "competitor_update",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::PriceChange(event) => event.timestamp,
            Self::Purchase(event) => event.timestamp,
            Self::CustomerInteraction(event) => event.timestamp,
            Self::CompetitorUpdate { timestamp } => *timestamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChangeEvent {
    pub product_id: ProductId,
    pub product_name: String,
    pub old_price: f64,
    pub new_price: f64,
    /// Percent delta relative to the old price.
    pub change: f64,
    pub reason: String,
    pub strategy: String,
    pub demand: f64,
    pub expected_profit: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: f64,
    pub revenue: f64,
    pub profit: f64,
    pub remaining_stock: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub session_id: String,
    pub price: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Fire-and-forget fan-out to whoever is listening right now.
///
/// Publishing never blocks. Events sent while nobody is subscribed are dropped
/// and subscribers that fall more than the channel capacity behind skip ahead.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: MarketEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{EventBus, InteractionEvent, MarketEvent, PurchaseEvent};
    use crate::domain::market::InteractionType;
    use crate::domain::product::ProductId;

    fn purchase() -> MarketEvent {
        MarketEvent::Purchase(PurchaseEvent {
            product_id: ProductId("prod-003".to_string()),
            product_name: "Laptop Stand Aluminum".to_string(),
            quantity: 2,
            price: 39.99,
            revenue: 79.98,
            profit: 49.98,
            remaining_stock: 198,
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).single().expect("timestamp"),
        })
    }

    #[test]
    fn publish_without_subscribers_is_dropped_silently() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(purchase()), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_published_events() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.publish(purchase()), 2);

        assert_eq!(first.recv().await.expect("first receives"), purchase());
        assert_eq!(second.recv().await.expect("second receives"), purchase());
    }

    #[test]
    fn events_serialize_with_event_tag_and_camel_case_payload() {
        let value = serde_json::to_value(purchase()).expect("serialize");

        assert_eq!(
            value,
            json!({
                "event": "purchase",
                "data": {
                    "productId": "prod-003",
                    "productName": "Laptop Stand Aluminum",
                    "quantity": 2,
                    "price": 39.99,
                    "revenue": 79.98,
                    "profit": 49.98,
                    "remainingStock": 198,
                    "timestamp": 1_700_000_000_000_i64,
                },
            })
        );

        let sweep = MarketEvent::CompetitorUpdate {
            timestamp: Utc.timestamp_millis_opt(5).single().expect("timestamp"),
        };
        assert_eq!(
            serde_json::to_value(sweep).expect("serialize"),
            json!({ "event": "competitor_update", "data": { "timestamp": 5 } })
        );
    }

    #[test]
    fn interaction_payload_carries_kind_under_type() {
        let event = MarketEvent::CustomerInteraction(InteractionEvent {
            product_id: ProductId("prod-005".to_string()),
            product_name: "USB-C Hub 7-in-1".to_string(),
            interaction_type: InteractionType::CartAdd,
            session_id: "session-1".to_string(),
            price: 49.99,
            timestamp: Utc.timestamp_millis_opt(42).single().expect("timestamp"),
        });

        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["event"], "customer_interaction");
        assert_eq!(value["data"]["type"], "cart_add");
        assert_eq!(value["data"]["sessionId"], "session-1");
        assert!(value["data"].get("interactionType").is_none());

        let decoded: MarketEvent = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, event);
    }
}
