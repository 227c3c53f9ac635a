//! Purchase orchestration: the only component with cross-resource logic.
//!
//! A purchase is a saga over four independently-owned resources (wallet,
//! inventory, stock, transaction log), not one ACID transaction. The
//! forward sequence is ordered so every step before the wallet debit is
//! free of side effects; from the debit on, each applied step records its
//! inverse and a failure runs the inverses in reverse order (stock
//! re-increment, inventory void, wallet refund) before the transaction
//! settles in `failed`. A compensation failure leaves the transaction in
//! `compensating` as a durable partial-failure marker.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::payment::{coin_due, money_due};
use crate::domain::{
    DenyReason, EventBus, MarketEvent, ProductId, PurchaseCheck, PurchaseRequest,
    ShippingAddress, UserId, token,
};
use crate::error::MarketError;
use crate::persistence::MarketStore;
use crate::persistence::models::{
    InventoryItem, NewInventoryUnit, NewShippingRecord, NewTransaction, Product, Transaction,
    TransactionStatus,
};
use crate::service::mission_service::MissionService;
use crate::service::payment_gateway::PaymentGateway;

/// Outcome of one cart line during checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CartPurchaseOutcome {
    /// Product the line referred to.
    pub product_id: ProductId,
    /// Units the line requested.
    pub quantity: i64,
    /// The completed transaction, when the line succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
    /// Failure description, when the line failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Forward steps applied so far, recorded for compensation.
#[derive(Debug, Default)]
struct Applied {
    debited: i64,
    minted: bool,
    stock_reserved: i64,
}

/// Top-level purchase coordinator.
///
/// Stateless between calls: owns the store, the fiat gateway stub, the
/// mission service for the best-effort trigger, and the event bus.
#[derive(Debug)]
pub struct PurchaseService<S> {
    store: Arc<S>,
    gateway: Arc<dyn PaymentGateway>,
    missions: Arc<MissionService<S>>,
    event_bus: EventBus,
}

impl<S> PurchaseService<S>
where
    S: MarketStore + 'static,
{
    /// Creates a new `PurchaseService`.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        gateway: Arc<dyn PaymentGateway>,
        missions: Arc<MissionService<S>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            gateway,
            missions,
            event_bus,
        }
    }

    /// Purchases `quantity` units of a product for a user.
    ///
    /// Validation (product, stock, payment method, per-user cap, balance)
    /// runs before any mutation; the durable `pending` transaction row is
    /// then the anchor for the fulfilment saga. Retried calls carrying
    /// the same `idempotency_key` return the already-recorded transaction
    /// without charging again.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidRequest`],
    /// [`MarketError::ProductNotFound`],
    /// [`MarketError::InsufficientStock`],
    /// [`MarketError::PaymentMethodMismatch`],
    /// [`MarketError::PerUserCapExceeded`],
    /// [`MarketError::InsufficientBalance`],
    /// [`MarketError::Persistence`], or [`MarketError::PartialFailure`]
    /// when compensation itself fails.
    pub async fn purchase_single(
        &self,
        user_id: UserId,
        req: PurchaseRequest,
    ) -> Result<Transaction, MarketError> {
        req.validate()?;

        if let Some(key) = req.idempotency_key.as_deref() {
            if let Some(existing) = self.store.find_by_idempotency_key(user_id, key).await? {
                tracing::debug!(
                    %user_id,
                    transaction_id = %existing.id,
                    idempotency_key = key,
                    "returning already-recorded transaction"
                );
                return Ok(existing);
            }
        }

        let product = self
            .store
            .get_active_product(req.product_id)
            .await?
            .ok_or_else(|| MarketError::ProductNotFound(*req.product_id.as_uuid()))?;

        if !product.unlimited_stock && product.stock_quantity < req.quantity {
            return Err(MarketError::InsufficientStock {
                product_id: *product.id.as_uuid(),
                requested: req.quantity,
            });
        }
        if !product.payment_methods.accepts(req.payment_method) {
            return Err(MarketError::PaymentMethodMismatch {
                product_id: *product.id.as_uuid(),
                requested: req.payment_method.to_string(),
            });
        }
        if let Some(cap) = product.max_per_user {
            let owned = self.store.count_units(user_id, product.id).await?;
            if owned + req.quantity > cap {
                return Err(MarketError::PerUserCapExceeded {
                    product_id: *product.id.as_uuid(),
                    cap,
                });
            }
        }

        let price = product.price();
        let coin = coin_due(&price, req.payment_method, req.quantity);
        let money = money_due(&price, req.payment_method, req.quantity);

        if coin > 0 {
            let wallet = self.store.get_or_create_wallet(user_id).await?;
            if wallet.balance < coin {
                return Err(MarketError::InsufficientBalance {
                    required: coin,
                    available: wallet.balance,
                });
            }
        }

        let metadata = serde_json::json!({
            "quantity": req.quantity,
            "shipping_address": &req.shipping_address,
        });
        let tx = self
            .store
            .insert_transaction(NewTransaction {
                user_id,
                product_id: product.id,
                quantity: req.quantity,
                amount_jestcoin: coin,
                amount_money: money,
                payment_method: req.payment_method,
                idempotency_key: req.idempotency_key.clone(),
                metadata,
            })
            .await?;

        match self.fulfill(&product, &tx, user_id, &req, coin, money).await {
            Ok(done) => {
                tracing::info!(
                    %user_id,
                    transaction_id = %done.id,
                    product_id = %product.id,
                    quantity = req.quantity,
                    amount_jestcoin = coin,
                    amount_money = %money,
                    "purchase completed"
                );
                self.event_bus.publish(MarketEvent::PurchaseCompleted {
                    transaction_id: done.id,
                    user_id,
                    product_id: product.id,
                    quantity: req.quantity,
                    amount_jestcoin: coin,
                    amount_money: money.to_string(),
                    payment_method: req.payment_method,
                    timestamp: Utc::now(),
                });
                self.spawn_first_purchase_trigger(user_id);
                Ok(done)
            }
            Err(err) => {
                self.event_bus.publish(MarketEvent::PurchaseFailed {
                    transaction_id: tx.id,
                    user_id,
                    product_id: product.id,
                    reason: err.to_string(),
                    timestamp: Utc::now(),
                });
                Err(err)
            }
        }
    }

    /// Attempts every line of the user's cart as an independent purchase
    /// and clears only the lines that succeeded. An optional shipping
    /// address applies to every physical line.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] when the cart itself cannot
    /// be read or a succeeded line cannot be cleared; per-line failures
    /// are collected in the outcomes, not propagated.
    pub async fn purchase_cart(
        &self,
        user_id: UserId,
        shipping_address: Option<ShippingAddress>,
    ) -> Result<Vec<CartPurchaseOutcome>, MarketError> {
        let lines = self.store.cart_items(user_id).await?;
        let mut outcomes = Vec::with_capacity(lines.len());

        for line in lines {
            let req = PurchaseRequest {
                product_id: line.product_id,
                quantity: line.quantity,
                payment_method: line.selected_payment_method,
                idempotency_key: None,
                shipping_address: shipping_address.clone(),
            };
            match self.purchase_single(user_id, req).await {
                Ok(tx) => {
                    self.store.remove_cart_item(user_id, line.product_id).await?;
                    outcomes.push(CartPurchaseOutcome {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        transaction: Some(tx),
                        error: None,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        %user_id,
                        product_id = %line.product_id,
                        error = %err,
                        "cart line purchase failed"
                    );
                    outcomes.push(CartPurchaseOutcome {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        transaction: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        Ok(outcomes)
    }

    /// Lists the user's purchase transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    pub async fn purchase_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Transaction>, MarketError> {
        self.store.purchase_history(user_id).await
    }

    /// Side-effect-free pre-flight check covering product existence,
    /// stock, and the per-user cap.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure; policy
    /// denials are reported in the returned check, not as errors.
    pub async fn can_purchase(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<PurchaseCheck, MarketError> {
        if quantity < 1 {
            return Ok(PurchaseCheck::denied(DenyReason::InvalidQuantity));
        }
        let Some(product) = self.store.get_active_product(product_id).await? else {
            return Ok(PurchaseCheck::denied(DenyReason::ProductNotFound));
        };
        if !product.unlimited_stock && product.stock_quantity < quantity {
            return Ok(PurchaseCheck::denied(DenyReason::InsufficientStock));
        }
        if let Some(cap) = product.max_per_user {
            let owned = self.store.count_units(user_id, product_id).await?;
            if owned + quantity > cap {
                return Ok(PurchaseCheck::denied(DenyReason::PerUserCapExceeded));
            }
        }
        Ok(PurchaseCheck::allowed())
    }

    async fn fulfill(
        &self,
        product: &Product,
        tx: &Transaction,
        user_id: UserId,
        req: &PurchaseRequest,
        coin: i64,
        money: Decimal,
    ) -> Result<Transaction, MarketError> {
        let mut applied = Applied::default();
        match self
            .run_forward(product, tx, user_id, req, coin, money, &mut applied)
            .await
        {
            Ok(done) => Ok(done),
            Err(err) => {
                self.compensate(product, tx.id, user_id, &applied, &err)
                    .await?;
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_forward(
        &self,
        product: &Product,
        tx: &Transaction,
        user_id: UserId,
        req: &PurchaseRequest,
        coin: i64,
        money: Decimal,
        applied: &mut Applied,
    ) -> Result<Transaction, MarketError> {
        if coin > 0 {
            self.store.debit(user_id, coin).await?;
            applied.debited = coin;
            self.store
                .set_status(tx.id, TransactionStatus::Debited)
                .await?;
        }

        if money > Decimal::ZERO {
            self.gateway.charge(user_id, tx.id, money).await?;
        }

        let mut units: Vec<InventoryItem> = Vec::new();
        for seq in 0..req.quantity {
            let token_id = token::mint_token_id(product.id, user_id, seq);
            let unit = self
                .store
                .mint_unit(NewInventoryUnit {
                    user_id,
                    product_id: product.id,
                    transaction_id: tx.id,
                    token_id,
                    price: product.price(),
                    payment_method: req.payment_method,
                })
                .await?;
            applied.minted = true;
            units.push(unit);
        }

        let level = self
            .store
            .reserve_and_record_sale(product.id, req.quantity)
            .await?;
        if !product.unlimited_stock {
            applied.stock_reserved = req.quantity;
        }
        self.store
            .set_status(tx.id, TransactionStatus::Fulfilled)
            .await?;
        if level.remaining == Some(0) {
            self.event_bus.publish(MarketEvent::StockDepleted {
                product_id: product.id,
                timestamp: Utc::now(),
            });
        }

        if product.requires_shipping {
            if let Some(address) = &req.shipping_address {
                for unit in &units {
                    self.store
                        .insert_shipping_record(NewShippingRecord {
                            transaction_id: tx.id,
                            inventory_item_id: unit.id,
                            user_id,
                            address: address.clone(),
                        })
                        .await?;
                }
            }
        }

        self.store.mark_completed(tx.id).await
    }

    /// Runs the recorded inverses in reverse order and settles the
    /// transaction in `failed`. Any inverse failing leaves the row in
    /// `compensating` and surfaces as a partial failure.
    async fn compensate(
        &self,
        product: &Product,
        transaction_id: Uuid,
        user_id: UserId,
        applied: &Applied,
        cause: &MarketError,
    ) -> Result<(), MarketError> {
        tracing::warn!(
            %transaction_id,
            %user_id,
            error = %cause,
            "purchase failed, compensating applied steps"
        );
        if let Err(err) = self
            .store
            .set_status(transaction_id, TransactionStatus::Compensating)
            .await
        {
            tracing::error!(%transaction_id, error = %err, "could not mark transaction compensating");
        }

        if applied.stock_reserved > 0 {
            self.store
                .release_stock(product.id, applied.stock_reserved)
                .await
                .map_err(|err| partial(transaction_id, "stock release", &err))?;
        }
        if applied.minted {
            self.store
                .void_units(transaction_id)
                .await
                .map_err(|err| partial(transaction_id, "inventory void", &err))?;
        }
        if applied.debited > 0 {
            self.store
                .refund(user_id, applied.debited)
                .await
                .map_err(|err| partial(transaction_id, "wallet refund", &err))?;
        }
        self.store
            .mark_failed(transaction_id, &cause.to_string())
            .await
            .map_err(|err| partial(transaction_id, "failure record", &err))?;
        Ok(())
    }

    fn spawn_first_purchase_trigger(&self, user_id: UserId) {
        // Missions are a best-effort side channel: failures here are
        // logged and never reach the purchase caller.
        let missions = Arc::clone(&self.missions);
        tokio::spawn(async move {
            if let Err(err) = missions.trigger_first_purchase(user_id).await {
                tracing::warn!(%user_id, error = %err, "first-purchase mission trigger failed");
            }
        });
    }
}

fn partial(transaction_id: Uuid, step: &str, err: &MarketError) -> MarketError {
    tracing::error!(%transaction_id, step, error = %err, "compensation step failed");
    MarketError::PartialFailure {
        transaction_id,
        message: format!("{step} failed during compensation: {err}"),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::PaymentMethod;
    use crate::persistence::MemoryStore;
    use crate::persistence::store::{InventoryStore, TransactionLog, WalletLedger};
    use crate::service::payment_gateway::NoopGateway;
    use async_trait::async_trait;
    use std::collections::HashSet;

    fn make_product(coin: i64, cents: i64, methods: PaymentMethod, stock: i64) -> Product {
        Product {
            id: ProductId::new(),
            name: "Signed Vinyl".to_string(),
            price_jestcoin: coin,
            price_money: Decimal::new(cents, 2),
            payment_methods: methods,
            stock_quantity: stock,
            unlimited_stock: false,
            max_per_user: None,
            total_sold: 0,
            requires_shipping: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_service(
        store: Arc<MemoryStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> PurchaseService<MemoryStore> {
        let event_bus = EventBus::new(1000);
        let missions = Arc::new(MissionService::new(Arc::clone(&store), event_bus.clone()));
        PurchaseService::new(store, gateway, missions, event_bus)
    }

    fn request(product_id: ProductId, quantity: i64, method: PaymentMethod) -> PurchaseRequest {
        PurchaseRequest {
            product_id,
            quantity,
            payment_method: method,
            idempotency_key: None,
            shipping_address: None,
        }
    }

    async fn seed(
        product: Product,
        balance: i64,
    ) -> (Arc<MemoryStore>, PurchaseService<MemoryStore>, UserId) {
        let store = Arc::new(MemoryStore::new());
        store.insert_product(product).await;
        let user = UserId::new();
        if balance > 0 {
            let credited = store.credit(user, balance).await;
            assert!(credited.is_ok());
        }
        let service = make_service(Arc::clone(&store), Arc::new(NoopGateway));
        (store, service, user)
    }

    #[tokio::test]
    async fn jestcoin_purchase_debits_mints_and_decrements_stock() {
        let product = make_product(100, 0, PaymentMethod::Jestcoin, 10);
        let product_id = product.id;
        let (store, service, user) = seed(product, 250).await;

        let tx = service
            .purchase_single(user, request(product_id, 2, PaymentMethod::Jestcoin))
            .await;
        let Ok(tx) = tx else {
            panic!("purchase failed");
        };
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.amount_jestcoin, 200);
        assert!(tx.completed_at.is_some());

        let wallet = store.get_or_create_wallet(user).await;
        let Ok(wallet) = wallet else {
            panic!("wallet lookup failed");
        };
        assert_eq!(wallet.balance, 50);
        assert_eq!(wallet.total_spent, 200);

        let items = store.list_inventory(user).await;
        let Ok(items) = items else {
            panic!("inventory lookup failed");
        };
        assert_eq!(items.len(), 2);

        let after = store.product(product_id).await;
        let Some(after) = after else {
            panic!("product missing");
        };
        assert_eq!(after.stock_quantity, 8);
        assert_eq!(after.total_sold, 2);
    }

    #[tokio::test]
    async fn minted_units_carry_distinct_token_ids() {
        let product = make_product(10, 0, PaymentMethod::Jestcoin, 10);
        let product_id = product.id;
        let (store, service, user) = seed(product, 100).await;

        let tx = service
            .purchase_single(user, request(product_id, 5, PaymentMethod::Jestcoin))
            .await;
        assert!(tx.is_ok());

        let items = store.list_inventory(user).await;
        let Ok(items) = items else {
            panic!("inventory lookup failed");
        };
        let tokens: HashSet<&str> = items.iter().map(|i| i.token_id.as_str()).collect();
        assert_eq!(tokens.len(), 5);
    }

    #[tokio::test]
    async fn hybrid_purchase_with_short_balance_fails_without_side_effects() {
        let product = make_product(100, 500, PaymentMethod::Hybrid, 10);
        let product_id = product.id;
        let (store, service, user) = seed(product, 40).await;

        let result = service
            .purchase_single(user, request(product_id, 1, PaymentMethod::Hybrid))
            .await;
        assert!(matches!(
            result,
            Err(MarketError::InsufficientBalance {
                required: 50,
                available: 40,
            })
        ));

        let wallet = store.get_or_create_wallet(user).await;
        let Ok(wallet) = wallet else {
            panic!("wallet lookup failed");
        };
        assert_eq!(wallet.balance, 40);
        assert_eq!(wallet.total_spent, 0);

        let history = service.purchase_history(user).await;
        let Ok(history) = history else {
            panic!("history lookup failed");
        };
        assert!(history.is_empty(), "no transaction row before the debit check");

        let items = store.list_inventory(user).await;
        let Ok(items) = items else {
            panic!("inventory lookup failed");
        };
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn oversized_quantity_fails_with_insufficient_stock() {
        let product = make_product(10, 0, PaymentMethod::Jestcoin, 3);
        let product_id = product.id;
        let (store, service, user) = seed(product, 1000).await;

        let result = service
            .purchase_single(user, request(product_id, 4, PaymentMethod::Jestcoin))
            .await;
        assert!(matches!(result, Err(MarketError::InsufficientStock { .. })));

        let wallet = store.get_or_create_wallet(user).await;
        let Ok(wallet) = wallet else {
            panic!("wallet lookup failed");
        };
        assert_eq!(wallet.balance, 1000);
        let items = store.list_inventory(user).await;
        let Ok(items) = items else {
            panic!("inventory lookup failed");
        };
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn unlimited_stock_counts_sales_without_decrementing() {
        let mut product = make_product(10, 0, PaymentMethod::Jestcoin, 0);
        product.unlimited_stock = true;
        let product_id = product.id;
        let (store, service, user) = seed(product, 100).await;

        let tx = service
            .purchase_single(user, request(product_id, 3, PaymentMethod::Jestcoin))
            .await;
        assert!(tx.is_ok());

        let after = store.product(product_id).await;
        let Some(after) = after else {
            panic!("product missing");
        };
        assert_eq!(after.stock_quantity, 0);
        assert_eq!(after.total_sold, 3);
    }

    #[tokio::test]
    async fn money_only_product_rejects_coin_payment() {
        let product = make_product(0, 1999, PaymentMethod::Money, 10);
        let product_id = product.id;
        let (_, service, user) = seed(product, 100).await;

        let result = service
            .purchase_single(user, request(product_id, 1, PaymentMethod::Jestcoin))
            .await;
        assert!(matches!(
            result,
            Err(MarketError::PaymentMethodMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn per_user_cap_limits_owned_units() {
        let mut product = make_product(10, 0, PaymentMethod::Jestcoin, 100);
        product.max_per_user = Some(2);
        let product_id = product.id;
        let (_, service, user) = seed(product, 1000).await;

        let first = service
            .purchase_single(user, request(product_id, 2, PaymentMethod::Jestcoin))
            .await;
        assert!(first.is_ok());

        let second = service
            .purchase_single(user, request(product_id, 1, PaymentMethod::Jestcoin))
            .await;
        assert!(matches!(second, Err(MarketError::PerUserCapExceeded { .. })));
    }

    #[tokio::test]
    async fn idempotency_key_replays_without_double_charge() {
        let product = make_product(100, 0, PaymentMethod::Jestcoin, 10);
        let product_id = product.id;
        let (store, service, user) = seed(product, 500).await;

        let mut req = request(product_id, 1, PaymentMethod::Jestcoin);
        req.idempotency_key = Some("order-42".to_string());

        let first = service.purchase_single(user, req.clone()).await;
        let Ok(first) = first else {
            panic!("first purchase failed");
        };
        let second = service.purchase_single(user, req).await;
        let Ok(second) = second else {
            panic!("replay failed");
        };
        assert_eq!(first.id, second.id);

        let wallet = store.get_or_create_wallet(user).await;
        let Ok(wallet) = wallet else {
            panic!("wallet lookup failed");
        };
        assert_eq!(wallet.balance, 400, "wallet must be charged exactly once");
    }

    #[tokio::test]
    async fn racing_duplicate_idempotency_keys_record_one_transaction() {
        let product = make_product(100, 0, PaymentMethod::Jestcoin, 10);
        let product_id = product.id;
        let (store, service, user) = seed(product, 500).await;

        // Two writers that both passed the pre-check insert under the
        // same key; the store replays the recorded row for the loser.
        let new_tx = |key: &str| NewTransaction {
            user_id: user,
            product_id,
            quantity: 1,
            amount_jestcoin: 100,
            amount_money: Decimal::ZERO,
            payment_method: PaymentMethod::Jestcoin,
            idempotency_key: Some(key.to_string()),
            metadata: serde_json::json!({}),
        };
        let first = store.insert_transaction(new_tx("order-7")).await;
        let Ok(first) = first else {
            panic!("insert failed");
        };
        let second = store.insert_transaction(new_tx("order-7")).await;
        let Ok(second) = second else {
            panic!("duplicate insert failed");
        };
        assert_eq!(first.id, second.id);

        let history = service.purchase_history(user).await;
        let Ok(history) = history else {
            panic!("history lookup failed");
        };
        assert_eq!(history.len(), 1, "only one row may be recorded");
    }

    /// Gateway double that declines every charge, forcing compensation
    /// after the wallet debit.
    #[derive(Debug)]
    struct DecliningGateway;

    #[async_trait]
    impl PaymentGateway for DecliningGateway {
        async fn charge(
            &self,
            _user_id: UserId,
            _transaction_id: Uuid,
            _amount: Decimal,
        ) -> Result<(), MarketError> {
            Err(MarketError::PaymentGateway("card declined".to_string()))
        }
    }

    #[tokio::test]
    async fn declined_fiat_charge_compensates_the_debit() {
        let product = make_product(100, 500, PaymentMethod::Hybrid, 10);
        let product_id = product.id;
        let store = Arc::new(MemoryStore::new());
        store.insert_product(product).await;
        let user = UserId::new();
        let credited = store.credit(user, 200).await;
        assert!(credited.is_ok());
        let service = make_service(Arc::clone(&store), Arc::new(DecliningGateway));

        let result = service
            .purchase_single(user, request(product_id, 1, PaymentMethod::Hybrid))
            .await;
        assert!(matches!(result, Err(MarketError::PaymentGateway(_))));

        // Debit of the 50-coin share was applied, then refunded.
        let wallet = store.get_or_create_wallet(user).await;
        let Ok(wallet) = wallet else {
            panic!("wallet lookup failed");
        };
        assert_eq!(wallet.balance, 200);
        assert_eq!(wallet.total_spent, 0);

        let items = store.list_inventory(user).await;
        let Ok(items) = items else {
            panic!("inventory lookup failed");
        };
        assert!(items.is_empty());

        // Stock untouched, transaction settled in failed with a message.
        let after = store.product(product_id).await;
        let Some(after) = after else {
            panic!("product missing");
        };
        assert_eq!(after.stock_quantity, 10);

        let history = service.purchase_history(user).await;
        let Ok(history) = history else {
            panic!("history lookup failed");
        };
        assert_eq!(history.len(), 1);
        let Some(tx) = history.first() else {
            panic!("transaction missing");
        };
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert!(tx.error_message.as_deref().is_some_and(|m| m.contains("declined")));
    }

    #[tokio::test]
    async fn shipping_records_are_written_per_unit() {
        let mut product = make_product(10, 0, PaymentMethod::Jestcoin, 10);
        product.requires_shipping = true;
        let product_id = product.id;
        let (store, service, user) = seed(product, 100).await;

        let mut req = request(product_id, 2, PaymentMethod::Jestcoin);
        req.shipping_address = Some(ShippingAddress {
            recipient_name: "Ada".to_string(),
            address_line1: "1 Main St".to_string(),
            address_line2: None,
            city: "Lisbon".to_string(),
            state: "LX".to_string(),
            postal_code: "1000".to_string(),
            country: "PT".to_string(),
            phone: None,
        });

        let tx = service.purchase_single(user, req).await;
        assert!(tx.is_ok());

        let records = store.shipping_records().await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == "pending"));
    }

    #[tokio::test]
    async fn selling_out_publishes_stock_depleted() {
        let product = make_product(10, 0, PaymentMethod::Jestcoin, 2);
        let product_id = product.id;
        let store = Arc::new(MemoryStore::new());
        store.insert_product(product).await;
        let user = UserId::new();
        let credited = store.credit(user, 100).await;
        assert!(credited.is_ok());

        let event_bus = EventBus::new(100);
        let mut rx = event_bus.subscribe();
        let missions = Arc::new(MissionService::new(Arc::clone(&store), event_bus.clone()));
        let service = PurchaseService::new(
            Arc::clone(&store),
            Arc::new(NoopGateway),
            missions,
            event_bus,
        );

        let tx = service
            .purchase_single(user, request(product_id, 2, PaymentMethod::Jestcoin))
            .await;
        assert!(tx.is_ok());

        let first = rx.recv().await;
        let Ok(first) = first else {
            panic!("expected event");
        };
        assert_eq!(first.event_type_str(), "stock_depleted");
        let second = rx.recv().await;
        let Ok(second) = second else {
            panic!("expected event");
        };
        assert_eq!(second.event_type_str(), "purchase_completed");
    }

    #[tokio::test]
    async fn cart_checkout_clears_only_successful_lines() {
        let cheap = make_product(10, 0, PaymentMethod::Jestcoin, 100);
        let scarce = make_product(10, 0, PaymentMethod::Jestcoin, 1);
        let cheap_id = cheap.id;
        let scarce_id = scarce.id;
        let store = Arc::new(MemoryStore::new());
        store.insert_product(cheap).await;
        store.insert_product(scarce).await;
        let user = UserId::new();
        let credited = store.credit(user, 1000).await;
        assert!(credited.is_ok());

        use crate::persistence::store::CartStore;
        let a = store
            .add_cart_item(user, cheap_id, 2, PaymentMethod::Jestcoin)
            .await;
        assert!(a.is_ok());
        let b = store
            .add_cart_item(user, scarce_id, 5, PaymentMethod::Jestcoin)
            .await;
        assert!(b.is_ok());

        let service = make_service(Arc::clone(&store), Arc::new(NoopGateway));
        let outcomes = service.purchase_cart(user, None).await;
        let Ok(outcomes) = outcomes else {
            panic!("checkout failed");
        };
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes.iter().filter(|o| o.transaction.is_some()).count(),
            1
        );
        assert_eq!(outcomes.iter().filter(|o| o.error.is_some()).count(), 1);

        // Failed line stays in the cart for another attempt.
        let remaining = store.cart_items(user).await;
        let Ok(remaining) = remaining else {
            panic!("cart lookup failed");
        };
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.first().map(|l| l.product_id), Some(scarce_id));
    }

    #[tokio::test]
    async fn can_purchase_reports_reasons_without_side_effects() {
        let mut product = make_product(10, 0, PaymentMethod::Jestcoin, 2);
        product.max_per_user = Some(2);
        let product_id = product.id;
        let (store, service, user) = seed(product, 100).await;

        let ok = service.can_purchase(user, product_id, 2).await;
        let Ok(ok) = ok else {
            panic!("check failed");
        };
        assert!(ok.allowed);

        let too_many = service.can_purchase(user, product_id, 3).await;
        let Ok(too_many) = too_many else {
            panic!("check failed");
        };
        assert_eq!(too_many.reason, Some(DenyReason::InsufficientStock));

        let missing = service.can_purchase(user, ProductId::new(), 1).await;
        let Ok(missing) = missing else {
            panic!("check failed");
        };
        assert_eq!(missing.reason, Some(DenyReason::ProductNotFound));

        // The check never wrote anything.
        let after = store.product(product_id).await;
        let Some(after) = after else {
            panic!("product missing");
        };
        assert_eq!(after.stock_quantity, 2);
        assert_eq!(after.total_sold, 0);
    }

    #[tokio::test]
    async fn concurrent_debits_never_jointly_overdraw() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::new();
        let credited = store.credit(user, 100).await;
        assert!(credited.is_ok());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.debit(user, 30).await }));
        }
        let mut successes: i64 = 0;
        for handle in handles {
            let joined = handle.await;
            let Ok(result) = joined else {
                panic!("task panicked");
            };
            if result.is_ok() {
                successes += 1;
            }
        }
        assert!(successes <= 3, "at most 3 debits of 30 fit in 100");

        let wallet = store.get_or_create_wallet(user).await;
        let Ok(wallet) = wallet else {
            panic!("wallet lookup failed");
        };
        assert_eq!(wallet.balance, 100 - 30 * successes);
        assert!(wallet.balance >= 0);
    }
}
