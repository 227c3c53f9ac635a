//! Store traits, one per marketplace resource.
//!
//! The orchestration layer is written against these traits so the same
//! purchase logic runs over [`super::PostgresStore`] in production and
//! [`super::MemoryStore`] in unit tests. Each trait owns one
//! independently-mutated resource; the wallet and stock traits carry the
//! subsystem's load-bearing concurrency contract: their mutations must be
//! single conditional updates, never a read followed by a write.

use async_trait::async_trait;
use uuid::Uuid;

use super::models::{
    CartItem, InventoryItem, Mission, NewInventoryUnit, NewShippingRecord, NewTransaction,
    Product, ShippingRecord, StockLevel, Transaction, TransactionStatus, UserReward, Wallet,
};
use crate::domain::{PaymentMethod, ProductId, UserId};
use crate::error::MarketError;

/// Read-only product lookup.
#[async_trait]
pub trait ProductCatalog {
    /// Fetches a product by ID when it exists and is active.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn get_active_product(&self, id: ProductId) -> Result<Option<Product>, MarketError>;

    /// Lists active products, optionally only those accepting `method`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn list_active_products(
        &self,
        method: Option<PaymentMethod>,
    ) -> Result<Vec<Product>, MarketError>;
}

/// Per-user Jest Coin balance with atomic credit/debit.
#[async_trait]
pub trait WalletLedger {
    /// Fetches the user's wallet, creating a zero-balance one on first
    /// access.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn get_or_create_wallet(&self, user_id: UserId) -> Result<Wallet, MarketError>;

    /// Atomically adds `amount` to the balance and `total_earned`,
    /// creating the wallet if absent. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidRequest`] when `amount < 1` and
    /// [`MarketError::Persistence`] on store failure.
    async fn credit(&self, user_id: UserId, amount: i64) -> Result<i64, MarketError>;

    /// Atomically subtracts `amount` from the balance and adds it to
    /// `total_spent`, guarded by `balance >= amount` in the same
    /// statement. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidRequest`] when `amount < 1`,
    /// [`MarketError::InsufficientBalance`] when the guard fails (or the
    /// wallet does not exist), and [`MarketError::Persistence`] on store
    /// failure.
    async fn debit(&self, user_id: UserId, amount: i64) -> Result<i64, MarketError>;

    /// Compensation inverse of [`WalletLedger::debit`]: restores `amount`
    /// to the balance and rolls `total_spent` back, without touching
    /// `total_earned`. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn refund(&self, user_id: UserId, amount: i64) -> Result<i64, MarketError>;
}

/// Per-unit ownership records.
#[async_trait]
pub trait InventoryStore {
    /// Inserts one ownership row for a freshly purchased unit.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure (including
    /// a token collision, which the UNIQUE constraint surfaces).
    async fn mint_unit(&self, unit: NewInventoryUnit) -> Result<InventoryItem, MarketError>;

    /// Lists a user's units, oldest acquisition first.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn list_inventory(&self, user_id: UserId) -> Result<Vec<InventoryItem>, MarketError>;

    /// Counts how many units of `product_id` the user owns (per-user cap
    /// enforcement).
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn count_units(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<i64, MarketError>;

    /// Sets or clears the showcase flag and display order of a unit.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::ItemNotFound`] when the unit does not exist
    /// and [`MarketError::Persistence`] on store failure.
    async fn set_showcase(
        &self,
        item_id: Uuid,
        showcased: bool,
        order: Option<i32>,
    ) -> Result<InventoryItem, MarketError>;

    /// One-way `not_redeemed → redeemed` transition.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::AlreadyRedeemed`] when the unit was
    /// already redeemed, [`MarketError::ItemNotFound`] when it does not
    /// exist, and [`MarketError::Persistence`] on store failure.
    async fn redeem(&self, item_id: Uuid) -> Result<InventoryItem, MarketError>;

    /// Compensation inverse of minting: removes the units a failed
    /// transaction minted. Returns the number of rows voided. Only valid
    /// for transactions that never reached `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn void_units(&self, transaction_id: Uuid) -> Result<u64, MarketError>;
}

/// Per-product stock and cumulative sold counters.
#[async_trait]
pub trait StockCounter {
    /// Atomically decrements stock by `quantity` and increments
    /// `total_sold`, re-reading stock at write time in the same
    /// statement. Unlimited-stock products skip the decrement and the
    /// guard but still count the sale.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InsufficientStock`] when finite stock is
    /// below `quantity` and [`MarketError::Persistence`] on store
    /// failure.
    async fn reserve_and_record_sale(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<StockLevel, MarketError>;

    /// Compensation inverse of a reservation: restores `quantity` to
    /// finite stock. `total_sold` stays monotonic and is not rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn release_stock(&self, product_id: ProductId, quantity: i64)
    -> Result<(), MarketError>;
}

/// Durable purchase transaction log.
#[async_trait]
pub trait TransactionLog {
    /// Inserts a new transaction in the `pending` state.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, MarketError>;

    /// Looks up the user's transaction recorded under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn find_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Transaction>, MarketError>;

    /// Advances a non-terminal transaction to `status`. Terminal rows are
    /// never modified; advancing one is a persistence-level bug surfaced
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] when the row is missing or
    /// already terminal, or on store failure.
    async fn set_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), MarketError>;

    /// Marks a non-terminal transaction `completed` with a completion
    /// timestamp and returns the final row.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] when the row is missing or
    /// already terminal, or on store failure.
    async fn mark_completed(&self, transaction_id: Uuid) -> Result<Transaction, MarketError>;

    /// Marks a non-terminal transaction `failed` with an error message.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] when the row is missing or
    /// already terminal, or on store failure.
    async fn mark_failed(&self, transaction_id: Uuid, error: &str) -> Result<(), MarketError>;

    /// Lists the user's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn purchase_history(&self, user_id: UserId) -> Result<Vec<Transaction>, MarketError>;

    /// Counts the user's `completed` transactions (first-purchase mission
    /// guard).
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn count_completed(&self, user_id: UserId) -> Result<i64, MarketError>;
}

/// Shipping record log for physical goods.
#[async_trait]
pub trait ShippingLog {
    /// Inserts one `pending` shipping record for a minted unit.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn insert_shipping_record(
        &self,
        record: NewShippingRecord,
    ) -> Result<ShippingRecord, MarketError>;
}

/// Pending per-user cart selections.
#[async_trait]
pub trait CartStore {
    /// Adds `quantity` of a product to the cart, merging into an
    /// existing (user, product) row instead of duplicating it. The
    /// payment method of the merged row is the most recent selection.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn add_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        method: PaymentMethod,
    ) -> Result<CartItem, MarketError>;

    /// Removes one product line from the cart; absent lines are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn remove_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), MarketError>;

    /// Empties the user's cart.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn clear_cart(&self, user_id: UserId) -> Result<(), MarketError>;

    /// Lists the user's cart lines, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, MarketError>;
}

/// Mission definitions and one-shot reward completion.
#[async_trait]
pub trait MissionStore {
    /// Fetches the mission with the given type discriminator, if any.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    async fn mission_by_type(&self, mission_type: &str) -> Result<Option<Mission>, MarketError>;

    /// Records a mission completion: inserts the reward row and credits
    /// the wallet as one logical unit, so a credit failure cannot leave
    /// an unrewarded completed mission.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::MissionNotFound`],
    /// [`MarketError::MissionInactive`], [`MarketError::MissionFull`],
    /// [`MarketError::MissionAlreadyCompleted`], or
    /// [`MarketError::Persistence`].
    async fn complete_mission(
        &self,
        user_id: UserId,
        mission_id: Uuid,
    ) -> Result<UserReward, MarketError>;
}

/// Everything the orchestration layer needs from one store.
pub trait MarketStore:
    ProductCatalog
    + WalletLedger
    + InventoryStore
    + StockCounter
    + TransactionLog
    + ShippingLog
    + CartStore
    + MissionStore
    + Send
    + Sync
{
}

impl<T> MarketStore for T where
    T: ProductCatalog
        + WalletLedger
        + InventoryStore
        + StockCounter
        + TransactionLog
        + ShippingLog
        + CartStore
        + MissionStore
        + Send
        + Sync
{
}
