//! Fan-out channel for market events.
//!
//! The purchase and mission services emit a [`MarketEvent`] after every
//! committed state change. [`EventBus`] fans those out over a
//! [`tokio::sync::broadcast`] channel to whoever is listening (the
//! content feed, operational tooling). Publishing never blocks and never
//! fails: with no subscribers the event is dropped, and a subscriber
//! that falls behind the ring buffer loses the oldest events.

use tokio::sync::broadcast;

use super::MarketEvent;

/// Cloneable handle to the broadcast channel carrying [`MarketEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
    /// Creates a bus whose ring buffer holds `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fans `event` out to every current subscriber.
    ///
    /// Fire-and-forget: the delivered-to count is recorded at trace
    /// level and otherwise discarded.
    pub fn publish(&self, event: MarketEvent) {
        let event_type = event.event_type_str();
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(event_type, delivered, "market event published");
    }

    /// Opens a new subscription positioned after all past events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }

    /// Number of currently open subscriptions.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ProductId, UserId};
    use chrono::Utc;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn depleted(product_id: ProductId) -> MarketEvent {
        MarketEvent::StockDepleted {
            product_id,
            timestamp: Utc::now(),
        }
    }

    fn failed(user_id: UserId) -> MarketEvent {
        MarketEvent::PurchaseFailed {
            transaction_id: uuid::Uuid::new_v4(),
            user_id,
            product_id: ProductId::new(),
            reason: "declined".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn events_published_before_subscribing_are_not_replayed() {
        let bus = EventBus::new(8);
        bus.publish(depleted(ProductId::new()));

        let mut rx = bus.subscribe();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(depleted(ProductId::new()));
        bus.publish(failed(UserId::new()));

        let Ok(first) = rx.recv().await else {
            panic!("first recv failed");
        };
        let Ok(second) = rx.recv().await else {
            panic!("second recv failed");
        };
        assert_eq!(first.event_type_str(), "stock_depleted");
        assert_eq!(second.event_type_str(), "purchase_failed");
    }

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let bus = EventBus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        bus.publish(depleted(ProductId::new()));

        for rx in [&mut rx1, &mut rx2] {
            let Ok(event) = rx.recv().await else {
                panic!("recv failed");
            };
            assert_eq!(event.event_type_str(), "stock_depleted");
        }
    }

    #[tokio::test]
    async fn slow_subscriber_skips_overwritten_events() {
        let bus = EventBus::new(1);
        let mut rx = bus.subscribe();

        bus.publish(depleted(ProductId::new()));
        bus.publish(failed(UserId::new()));

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        let Ok(survivor) = rx.recv().await else {
            panic!("recv after lag failed");
        };
        assert_eq!(survivor.event_type_str(), "purchase_failed");
    }

    #[test]
    fn dropped_subscriptions_leave_the_count() {
        let bus = EventBus::new(8);
        let rx = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx);
        assert_eq!(bus.receiver_count(), 1);
    }
}
