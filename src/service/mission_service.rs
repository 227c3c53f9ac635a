//! Mission completion and reward crediting.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{EventBus, MarketEvent, UserId};
use crate::error::MarketError;
use crate::persistence::models::UserReward;
use crate::persistence::store::{MissionStore, TransactionLog};

/// Mission type string for the first-completed-purchase mission.
pub const FIRST_PURCHASE_MISSION: &str = "first_purchase";

/// Coordinates mission completion: the store performs the reward insert
/// and wallet credit as one unit, and the service emits the
/// [`MarketEvent::MissionCompleted`] event.
#[derive(Debug)]
pub struct MissionService<S> {
    store: Arc<S>,
    event_bus: EventBus,
}

impl<S> MissionService<S>
where
    S: MissionStore + TransactionLog + Send + Sync,
{
    /// Creates a new `MissionService`.
    #[must_use]
    pub fn new(store: Arc<S>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Completes a mission for a user and credits the reward.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::MissionNotFound`],
    /// [`MarketError::MissionInactive`], [`MarketError::MissionFull`],
    /// [`MarketError::MissionAlreadyCompleted`], or
    /// [`MarketError::Persistence`].
    pub async fn complete_mission(
        &self,
        user_id: UserId,
        mission_id: Uuid,
    ) -> Result<UserReward, MarketError> {
        let reward = self.store.complete_mission(user_id, mission_id).await?;

        tracing::info!(
            %user_id,
            %mission_id,
            reward_amount = reward.reward_amount,
            "mission completed"
        );
        self.event_bus.publish(MarketEvent::MissionCompleted {
            user_id,
            mission_id,
            reward_amount: reward.reward_amount,
            timestamp: Utc::now(),
        });
        Ok(reward)
    }

    /// Evaluates the first-purchase mission after a completed purchase.
    ///
    /// Only proceeds when the user's completed-transaction count is
    /// exactly one, so later purchases can never re-trigger it. Returns
    /// `Ok(None)` when the mission does not apply (no such mission,
    /// not the first purchase, already completed, inactive, or full).
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure; policy
    /// outcomes are folded into `Ok(None)` because the trigger is a
    /// best-effort side channel.
    pub async fn trigger_first_purchase(
        &self,
        user_id: UserId,
    ) -> Result<Option<UserReward>, MarketError> {
        let completed = self.store.count_completed(user_id).await?;
        if completed != 1 {
            tracing::debug!(%user_id, completed, "first-purchase mission not applicable");
            return Ok(None);
        }
        let Some(mission) = self.store.mission_by_type(FIRST_PURCHASE_MISSION).await? else {
            return Ok(None);
        };
        match self.complete_mission(user_id, mission.id).await {
            Ok(reward) => Ok(Some(reward)),
            Err(
                MarketError::MissionAlreadyCompleted
                | MarketError::MissionInactive
                | MarketError::MissionFull,
            ) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::persistence::models::{Mission, NewTransaction, Transaction};
    use crate::persistence::store::WalletLedger;
    use crate::domain::{PaymentMethod, ProductId};
    use rust_decimal::Decimal;

    fn make_mission(reward: i64) -> Mission {
        Mission {
            id: Uuid::new_v4(),
            mission_type: FIRST_PURCHASE_MISSION.to_string(),
            name: "First purchase".to_string(),
            reward_amount: reward,
            max_completions: None,
            completion_count: 0,
            is_repeatable: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn make_service(store: Arc<MemoryStore>) -> MissionService<MemoryStore> {
        MissionService::new(store, EventBus::new(100))
    }

    async fn record_completed_purchase(store: &MemoryStore, user_id: UserId) -> Transaction {
        let tx = store
            .insert_transaction(NewTransaction {
                user_id,
                product_id: ProductId::new(),
                quantity: 1,
                amount_jestcoin: 10,
                amount_money: Decimal::ZERO,
                payment_method: PaymentMethod::Jestcoin,
                idempotency_key: None,
                metadata: serde_json::json!({}),
            })
            .await
            .ok()
            .unwrap_or_else(|| panic!("insert failed"));
        store
            .mark_completed(tx.id)
            .await
            .ok()
            .unwrap_or_else(|| panic!("completion failed"))
    }

    #[tokio::test]
    async fn complete_mission_credits_wallet_once() {
        let store = Arc::new(MemoryStore::new());
        let mission = make_mission(50);
        let mission_id = mission.id;
        store.insert_mission(mission).await;
        let service = make_service(Arc::clone(&store));
        let user = UserId::new();

        let reward = service.complete_mission(user, mission_id).await;
        assert!(reward.is_ok());

        // Second completion must fail and must not credit again.
        let second = service.complete_mission(user, mission_id).await;
        assert!(matches!(second, Err(MarketError::MissionAlreadyCompleted)));

        let wallet = store.get_or_create_wallet(user).await;
        let Ok(wallet) = wallet else {
            panic!("wallet lookup failed");
        };
        assert_eq!(wallet.balance, 50);
        assert_eq!(wallet.total_earned, 50);
    }

    #[tokio::test]
    async fn inactive_mission_does_not_complete() {
        let store = Arc::new(MemoryStore::new());
        let mut mission = make_mission(50);
        mission.is_active = false;
        let mission_id = mission.id;
        store.insert_mission(mission).await;
        let service = make_service(Arc::clone(&store));

        let result = service.complete_mission(UserId::new(), mission_id).await;
        assert!(matches!(result, Err(MarketError::MissionInactive)));
    }

    #[tokio::test]
    async fn full_mission_does_not_complete() {
        let store = Arc::new(MemoryStore::new());
        let mut mission = make_mission(50);
        mission.max_completions = Some(3);
        mission.completion_count = 3;
        let mission_id = mission.id;
        store.insert_mission(mission).await;
        let service = make_service(Arc::clone(&store));

        let result = service.complete_mission(UserId::new(), mission_id).await;
        assert!(matches!(result, Err(MarketError::MissionFull)));
    }

    #[tokio::test]
    async fn first_purchase_triggers_on_exactly_one_completed_purchase() {
        let store = Arc::new(MemoryStore::new());
        store.insert_mission(make_mission(100)).await;
        let service = make_service(Arc::clone(&store));
        let user = UserId::new();

        record_completed_purchase(&store, user).await;
        let reward = service.trigger_first_purchase(user).await;
        let Ok(Some(reward)) = reward else {
            panic!("expected first-purchase reward");
        };
        assert_eq!(reward.reward_amount, 100);
    }

    #[tokio::test]
    async fn first_purchase_does_not_retrigger_on_second_purchase() {
        let store = Arc::new(MemoryStore::new());
        store.insert_mission(make_mission(100)).await;
        let service = make_service(Arc::clone(&store));
        let user = UserId::new();

        record_completed_purchase(&store, user).await;
        record_completed_purchase(&store, user).await;

        let result = service.trigger_first_purchase(user).await;
        assert!(matches!(result, Ok(None)));

        let wallet = store.get_or_create_wallet(user).await;
        let Ok(wallet) = wallet else {
            panic!("wallet lookup failed");
        };
        assert_eq!(wallet.balance, 0, "second purchase must not credit");
    }

    #[tokio::test]
    async fn trigger_without_mission_definition_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let service = make_service(Arc::clone(&store));
        let user = UserId::new();

        record_completed_purchase(&store, user).await;
        let result = service.trigger_first_purchase(user).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn completion_publishes_event() {
        let store = Arc::new(MemoryStore::new());
        let mission = make_mission(25);
        let mission_id = mission.id;
        store.insert_mission(mission).await;
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let service = MissionService::new(Arc::clone(&store), bus);

        let result = service.complete_mission(UserId::new(), mission_id).await;
        assert!(result.is_ok());

        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected event");
        };
        assert_eq!(event.event_type_str(), "mission_completed");
    }
}
