//! Domain events reflecting marketplace state mutations.
//!
//! The purchase and mission services publish a [`MarketEvent`] after each
//! state change through the [`super::EventBus`]. The content-feed side of
//! the site subscribes to surface purchases and mission completions; this
//! service only publishes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::{ProductId, UserId};
use super::payment::PaymentMethod;

/// Domain event emitted after a state mutation.
///
/// Fiat amounts are stored as `String` to keep the two-decimal rendering
/// stable when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// Emitted when a purchase reaches the `completed` state.
    PurchaseCompleted {
        /// Completed transaction.
        transaction_id: uuid::Uuid,
        /// Buyer.
        user_id: UserId,
        /// Purchased product.
        product_id: ProductId,
        /// Units minted.
        quantity: i64,
        /// Jest Coin amount debited.
        amount_jestcoin: i64,
        /// Fiat amount charged (two-decimal string).
        amount_money: String,
        /// Payment method used.
        payment_method: PaymentMethod,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a purchase ends in `failed` (after compensation).
    PurchaseFailed {
        /// Failed transaction.
        transaction_id: uuid::Uuid,
        /// Buyer.
        user_id: UserId,
        /// Product that was being purchased.
        product_id: ProductId,
        /// Human-readable failure reason.
        reason: String,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a finite-stock product sells out.
    StockDepleted {
        /// Product whose stock reached zero.
        product_id: ProductId,
        /// Depletion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a mission credits a reward to a user.
    MissionCompleted {
        /// Rewarded user.
        user_id: UserId,
        /// Completed mission.
        mission_id: uuid::Uuid,
        /// Jest Coin amount credited.
        reward_amount: i64,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    /// Returns the snake_case event type string used as the JSON tag.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::PurchaseCompleted { .. } => "purchase_completed",
            Self::PurchaseFailed { .. } => "purchase_failed",
            Self::StockDepleted { .. } => "stock_depleted",
            Self::MissionCompleted { .. } => "mission_completed",
        }
    }

    /// Returns the user the event concerns, when it concerns one.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::PurchaseCompleted { user_id, .. }
            | Self::PurchaseFailed { user_id, .. }
            | Self::MissionCompleted { user_id, .. } => Some(*user_id),
            Self::StockDepleted { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_type_tag() {
        let event = MarketEvent::StockDepleted {
            product_id: ProductId::new(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(
            json.get("event_type").and_then(|v| v.as_str()),
            Some("stock_depleted")
        );
        assert_eq!(event.event_type_str(), "stock_depleted");
        assert!(event.user_id().is_none());
    }
}
