//! In-memory implementation of the store traits.
//!
//! Backs service unit tests and local development without a PostgreSQL
//! instance. Every check-and-mutate pair runs under one mutex hold, so
//! the store honours the same atomicity contract as the conditional
//! updates in [`super::PostgresStore`] and the concurrency properties of
//! the orchestrator remain observable in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{
    CartItem, InventoryItem, Mission, NewInventoryUnit, NewShippingRecord, NewTransaction,
    Product, ShippingRecord, StockLevel, Transaction, TransactionStatus, UserReward, Wallet,
};
use super::store::{
    CartStore, InventoryStore, MissionStore, ProductCatalog, ShippingLog, StockCounter,
    TransactionLog, WalletLedger,
};
use crate::domain::{PaymentMethod, ProductId, UserId};
use crate::error::MarketError;

#[derive(Debug, Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    wallets: HashMap<UserId, Wallet>,
    inventory: Vec<InventoryItem>,
    transactions: Vec<Transaction>,
    shipping: Vec<ShippingRecord>,
    missions: HashMap<Uuid, Mission>,
    rewards: Vec<UserReward>,
    cart: Vec<CartItem>,
}

impl Inner {
    fn wallet_entry(&mut self, user_id: UserId) -> &mut Wallet {
        self.wallets.entry(user_id).or_insert_with(|| Wallet {
            id: Uuid::new_v4(),
            user_id,
            balance: 0,
            total_earned: 0,
            total_spent: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }
}

/// In-memory store behind a single [`tokio::sync::Mutex`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product (catalog writes belong to the admin surface in
    /// production; tests and local runs seed through this).
    pub async fn insert_product(&self, product: Product) {
        self.inner
            .lock()
            .await
            .products
            .insert(product.id, product);
    }

    /// Seeds a mission definition.
    pub async fn insert_mission(&self, mission: Mission) {
        self.inner
            .lock()
            .await
            .missions
            .insert(mission.id, mission);
    }

    /// Returns a product regardless of its active flag (test inspection).
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.inner.lock().await.products.get(&id).cloned()
    }

    /// Returns the shipping records written so far (test inspection).
    pub async fn shipping_records(&self) -> Vec<ShippingRecord> {
        self.inner.lock().await.shipping.clone()
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn get_active_product(&self, id: ProductId) -> Result<Option<Product>, MarketError> {
        let inner = self.inner.lock().await;
        Ok(inner.products.get(&id).filter(|p| p.is_active).cloned())
    }

    async fn list_active_products(
        &self,
        method: Option<PaymentMethod>,
    ) -> Result<Vec<Product>, MarketError> {
        let inner = self.inner.lock().await;
        let mut products: Vec<Product> = inner
            .products
            .values()
            .filter(|p| p.is_active)
            .filter(|p| method.is_none_or(|m| p.payment_methods.accepts(m)))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }
}

#[async_trait]
impl WalletLedger for MemoryStore {
    async fn get_or_create_wallet(&self, user_id: UserId) -> Result<Wallet, MarketError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.wallet_entry(user_id).clone())
    }

    async fn credit(&self, user_id: UserId, amount: i64) -> Result<i64, MarketError> {
        if amount < 1 {
            return Err(MarketError::InvalidRequest(
                "credit amount must be positive".to_string(),
            ));
        }
        let mut inner = self.inner.lock().await;
        let wallet = inner.wallet_entry(user_id);
        wallet.balance += amount;
        wallet.total_earned += amount;
        wallet.updated_at = Utc::now();
        Ok(wallet.balance)
    }

    async fn debit(&self, user_id: UserId, amount: i64) -> Result<i64, MarketError> {
        if amount < 1 {
            return Err(MarketError::InvalidRequest(
                "debit amount must be positive".to_string(),
            ));
        }
        let mut inner = self.inner.lock().await;
        let wallet = inner.wallet_entry(user_id);
        if wallet.balance < amount {
            return Err(MarketError::InsufficientBalance {
                required: amount,
                available: wallet.balance,
            });
        }
        wallet.balance -= amount;
        wallet.total_spent += amount;
        wallet.updated_at = Utc::now();
        Ok(wallet.balance)
    }

    async fn refund(&self, user_id: UserId, amount: i64) -> Result<i64, MarketError> {
        let mut inner = self.inner.lock().await;
        let wallet = inner.wallet_entry(user_id);
        wallet.balance += amount;
        wallet.total_spent = (wallet.total_spent - amount).max(0);
        wallet.updated_at = Utc::now();
        Ok(wallet.balance)
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn mint_unit(&self, unit: NewInventoryUnit) -> Result<InventoryItem, MarketError> {
        let mut inner = self.inner.lock().await;
        if inner.inventory.iter().any(|i| i.token_id == unit.token_id) {
            return Err(MarketError::Persistence(format!(
                "token id collision: {}",
                unit.token_id
            )));
        }
        let item = InventoryItem {
            id: Uuid::new_v4(),
            user_id: unit.user_id,
            product_id: unit.product_id,
            transaction_id: unit.transaction_id,
            token_id: unit.token_id,
            price_jestcoin: unit.price.jestcoin,
            price_money: unit.price.money,
            payment_method: unit.payment_method,
            is_showcased: false,
            showcase_order: None,
            is_redeemed: false,
            redeemed_at: None,
            acquired_at: Utc::now(),
        };
        inner.inventory.push(item.clone());
        Ok(item)
    }

    async fn list_inventory(&self, user_id: UserId) -> Result<Vec<InventoryItem>, MarketError> {
        let inner = self.inner.lock().await;
        let mut items: Vec<InventoryItem> = inner
            .inventory
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.acquired_at.cmp(&b.acquired_at));
        Ok(items)
    }

    async fn count_units(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<i64, MarketError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .inventory
            .iter()
            .filter(|i| i.user_id == user_id && i.product_id == product_id)
            .count() as i64)
    }

    async fn set_showcase(
        &self,
        item_id: Uuid,
        showcased: bool,
        order: Option<i32>,
    ) -> Result<InventoryItem, MarketError> {
        let mut inner = self.inner.lock().await;
        let item = inner
            .inventory
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(MarketError::ItemNotFound(item_id))?;
        item.is_showcased = showcased;
        item.showcase_order = order;
        Ok(item.clone())
    }

    async fn redeem(&self, item_id: Uuid) -> Result<InventoryItem, MarketError> {
        let mut inner = self.inner.lock().await;
        let item = inner
            .inventory
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(MarketError::ItemNotFound(item_id))?;
        if item.is_redeemed {
            return Err(MarketError::AlreadyRedeemed(item_id));
        }
        item.is_redeemed = true;
        item.redeemed_at = Some(Utc::now());
        Ok(item.clone())
    }

    async fn void_units(&self, transaction_id: Uuid) -> Result<u64, MarketError> {
        let mut inner = self.inner.lock().await;
        let before = inner.inventory.len();
        inner.inventory.retain(|i| i.transaction_id != transaction_id);
        Ok((before - inner.inventory.len()) as u64)
    }
}

#[async_trait]
impl StockCounter for MemoryStore {
    async fn reserve_and_record_sale(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<StockLevel, MarketError> {
        let mut inner = self.inner.lock().await;
        let product = inner
            .products
            .get_mut(&product_id)
            .ok_or(MarketError::InsufficientStock {
                product_id: *product_id.as_uuid(),
                requested: quantity,
            })?;
        if product.unlimited_stock {
            product.total_sold += quantity;
            return Ok(StockLevel {
                remaining: None,
                total_sold: product.total_sold,
            });
        }
        if product.stock_quantity < quantity {
            return Err(MarketError::InsufficientStock {
                product_id: *product_id.as_uuid(),
                requested: quantity,
            });
        }
        product.stock_quantity -= quantity;
        product.total_sold += quantity;
        Ok(StockLevel {
            remaining: Some(product.stock_quantity),
            total_sold: product.total_sold,
        })
    }

    async fn release_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), MarketError> {
        let mut inner = self.inner.lock().await;
        if let Some(product) = inner.products.get_mut(&product_id) {
            if !product.unlimited_stock {
                product.stock_quantity += quantity;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionLog for MemoryStore {
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, MarketError> {
        let mut inner = self.inner.lock().await;
        // Same contract as the (user_id, idempotency_key) unique index:
        // a duplicate key replays the recorded transaction.
        if let Some(key) = tx.idempotency_key.as_deref() {
            if let Some(existing) = inner
                .transactions
                .iter()
                .find(|t| t.user_id == tx.user_id && t.idempotency_key.as_deref() == Some(key))
            {
                return Ok(existing.clone());
            }
        }
        let row = Transaction {
            id: Uuid::new_v4(),
            user_id: tx.user_id,
            product_id: tx.product_id,
            quantity: tx.quantity,
            amount_jestcoin: tx.amount_jestcoin,
            amount_money: tx.amount_money,
            payment_method: tx.payment_method,
            status: TransactionStatus::Pending,
            idempotency_key: tx.idempotency_key,
            metadata: tx.metadata,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        inner.transactions.push(row.clone());
        Ok(row)
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Transaction>, MarketError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .iter()
            .find(|t| t.user_id == user_id && t.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn set_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), MarketError> {
        let mut inner = self.inner.lock().await;
        let tx = inner
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id && !t.status.is_terminal())
            .ok_or_else(|| {
                MarketError::Persistence(format!(
                    "transaction {transaction_id} missing or already terminal"
                ))
            })?;
        tx.status = status;
        Ok(())
    }

    async fn mark_completed(&self, transaction_id: Uuid) -> Result<Transaction, MarketError> {
        let mut inner = self.inner.lock().await;
        let tx = inner
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id && !t.status.is_terminal())
            .ok_or_else(|| {
                MarketError::Persistence(format!(
                    "transaction {transaction_id} missing or already terminal"
                ))
            })?;
        tx.status = TransactionStatus::Completed;
        tx.completed_at = Some(Utc::now());
        Ok(tx.clone())
    }

    async fn mark_failed(&self, transaction_id: Uuid, error: &str) -> Result<(), MarketError> {
        let mut inner = self.inner.lock().await;
        let tx = inner
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id && !t.status.is_terminal())
            .ok_or_else(|| {
                MarketError::Persistence(format!(
                    "transaction {transaction_id} missing or already terminal"
                ))
            })?;
        tx.status = TransactionStatus::Failed;
        tx.error_message = Some(error.to_string());
        Ok(())
    }

    async fn purchase_history(&self, user_id: UserId) -> Result<Vec<Transaction>, MarketError> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<Transaction> = inner
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn count_completed(&self, user_id: UserId) -> Result<i64, MarketError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id && t.status == TransactionStatus::Completed)
            .count() as i64)
    }
}

#[async_trait]
impl ShippingLog for MemoryStore {
    async fn insert_shipping_record(
        &self,
        record: NewShippingRecord,
    ) -> Result<ShippingRecord, MarketError> {
        let mut inner = self.inner.lock().await;
        let row = ShippingRecord {
            id: Uuid::new_v4(),
            transaction_id: record.transaction_id,
            inventory_item_id: record.inventory_item_id,
            user_id: record.user_id,
            recipient_name: record.address.recipient_name,
            address_line1: record.address.address_line1,
            address_line2: record.address.address_line2,
            city: record.address.city,
            state: record.address.state,
            postal_code: record.address.postal_code,
            country: record.address.country,
            phone: record.address.phone,
            status: "pending".to_string(),
            created_at: Utc::now(),
        };
        inner.shipping.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn add_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        method: PaymentMethod,
    ) -> Result<CartItem, MarketError> {
        let mut inner = self.inner.lock().await;
        if let Some(line) = inner
            .cart
            .iter_mut()
            .find(|c| c.user_id == user_id && c.product_id == product_id)
        {
            line.quantity += quantity;
            line.selected_payment_method = method;
            line.updated_at = Utc::now();
            return Ok(line.clone());
        }
        let line = CartItem {
            user_id,
            product_id,
            quantity,
            selected_payment_method: method,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.cart.push(line.clone());
        Ok(line)
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), MarketError> {
        let mut inner = self.inner.lock().await;
        inner
            .cart
            .retain(|c| !(c.user_id == user_id && c.product_id == product_id));
        Ok(())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), MarketError> {
        let mut inner = self.inner.lock().await;
        inner.cart.retain(|c| c.user_id != user_id);
        Ok(())
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, MarketError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .cart
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MissionStore for MemoryStore {
    async fn mission_by_type(&self, mission_type: &str) -> Result<Option<Mission>, MarketError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .missions
            .values()
            .find(|m| m.mission_type == mission_type)
            .cloned())
    }

    async fn complete_mission(
        &self,
        user_id: UserId,
        mission_id: Uuid,
    ) -> Result<UserReward, MarketError> {
        let mut inner = self.inner.lock().await;
        let mission = inner
            .missions
            .get(&mission_id)
            .ok_or_else(|| MarketError::MissionNotFound(mission_id.to_string()))?
            .clone();

        if !mission.is_active {
            return Err(MarketError::MissionInactive);
        }
        if let Some(cap) = mission.max_completions {
            if mission.completion_count >= cap {
                return Err(MarketError::MissionFull);
            }
        }
        if !mission.is_repeatable
            && inner
                .rewards
                .iter()
                .any(|r| r.user_id == user_id && r.mission_id == mission_id)
        {
            return Err(MarketError::MissionAlreadyCompleted);
        }

        let reward = UserReward {
            id: Uuid::new_v4(),
            user_id,
            mission_id,
            reward_amount: mission.reward_amount,
            completed_at: Utc::now(),
        };
        inner.rewards.push(reward.clone());
        if let Some(m) = inner.missions.get_mut(&mission_id) {
            m.completion_count += 1;
        }
        let wallet = inner.wallet_entry(user_id);
        wallet.balance += mission.reward_amount;
        wallet.total_earned += mission.reward_amount;
        wallet.updated_at = Utc::now();
        Ok(reward)
    }
}
