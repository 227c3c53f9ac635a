//! Database models for the marketplace tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PaymentMethod, PriceTag, ProductId, ShippingAddress, UserId};

/// A catalog product row from the `products` table.
///
/// This subsystem only reads products; the admin CMS owns creation and
/// editing. `stock_quantity` and `total_sold` are the two fields mutated
/// here, exclusively through the conditional stock update.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Jest Coin price per unit (>= 0).
    pub price_jestcoin: i64,
    /// Fiat price per unit in two-decimal currency units (>= 0).
    pub price_money: Decimal,
    /// Payment methods the product accepts.
    pub payment_methods: PaymentMethod,
    /// Remaining stock; meaningless when `unlimited_stock` is set.
    pub stock_quantity: i64,
    /// Whether the product ignores stock accounting.
    pub unlimited_stock: bool,
    /// Maximum units a single user may own, when capped.
    pub max_per_user: Option<i64>,
    /// Cumulative units sold; monotonic non-decreasing.
    pub total_sold: i64,
    /// Whether purchases of this product create shipping records.
    pub requires_shipping: bool,
    /// Inactive products are invisible to the purchase flow.
    pub is_active: bool,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the per-unit dual-currency price.
    #[must_use]
    pub const fn price(&self) -> PriceTag {
        PriceTag {
            jestcoin: self.price_jestcoin,
            money: self.price_money,
        }
    }
}

/// A per-user Jest Coin wallet row from the `wallets` table.
///
/// Never written by direct field assignment; all balance changes go
/// through the conditional credit/debit updates so concurrent writers
/// cannot lose updates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wallet {
    /// Row identifier.
    pub id: Uuid,
    /// Owning user (unique).
    pub user_id: UserId,
    /// Current spendable balance (>= 0 at all times).
    pub balance: i64,
    /// Lifetime coin credited.
    pub total_earned: i64,
    /// Lifetime coin spent.
    pub total_spent: i64,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Transaction lifecycle state.
///
/// The purchase saga walks `pending → debited → fulfilled → completed`;
/// failures compensate through `compensating` into `failed`. `completed`
/// and `failed` are terminal and never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Durable anchor written before any mutation.
    Pending,
    /// Wallet debit applied.
    Debited,
    /// Inventory minted and stock recorded.
    Fulfilled,
    /// Terminal success.
    Completed,
    /// Failure detected; compensation running or stuck.
    Compensating,
    /// Terminal failure (compensation finished).
    Failed,
}

impl TransactionStatus {
    /// Whether the status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A purchase transaction row from the `transactions` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    /// Transaction identifier.
    pub id: Uuid,
    /// Buyer.
    pub user_id: UserId,
    /// Purchased product.
    pub product_id: ProductId,
    /// Units purchased.
    pub quantity: i64,
    /// Jest Coin amount charged.
    pub amount_jestcoin: i64,
    /// Fiat amount charged.
    pub amount_money: Decimal,
    /// Payment method used.
    pub payment_method: PaymentMethod,
    /// Saga state.
    pub status: TransactionStatus,
    /// Caller-supplied retry key; unique per user when present.
    pub idempotency_key: Option<String>,
    /// Auxiliary purchase data (shipping address, cart origin).
    pub metadata: serde_json::Value,
    /// Failure description for `failed`/`compensating` rows.
    pub error_message: Option<String>,
    /// Row creation timestamp (purchase start).
    pub created_at: DateTime<Utc>,
    /// Set when the transaction reaches `completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new pending transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Buyer.
    pub user_id: UserId,
    /// Purchased product.
    pub product_id: ProductId,
    /// Units purchased.
    pub quantity: i64,
    /// Jest Coin amount to be charged.
    pub amount_jestcoin: i64,
    /// Fiat amount to be charged.
    pub amount_money: Decimal,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Caller-supplied retry key.
    pub idempotency_key: Option<String>,
    /// Auxiliary purchase data.
    pub metadata: serde_json::Value,
}

/// A per-unit ownership row from the `inventory_items` table.
///
/// One row per owned unit. Rows of completed purchases are permanent;
/// only the showcase and redeemed flags mutate afterwards. Rows of a
/// failed purchase are voided by compensation before the transaction
/// reaches `failed`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryItem {
    /// Unit identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: UserId,
    /// Product the unit is an instance of.
    pub product_id: ProductId,
    /// Purchase that minted the unit (compensation audit link).
    pub transaction_id: Uuid,
    /// Globally-unique, never-reused token.
    pub token_id: String,
    /// Coin price snapshot at purchase time.
    pub price_jestcoin: i64,
    /// Fiat price snapshot at purchase time.
    pub price_money: Decimal,
    /// Payment method snapshot.
    pub payment_method: PaymentMethod,
    /// User-controlled public display flag.
    pub is_showcased: bool,
    /// Ordering among the user's showcased items.
    pub showcase_order: Option<i32>,
    /// One-way redemption flag.
    pub is_redeemed: bool,
    /// When the unit was redeemed.
    pub redeemed_at: Option<DateTime<Utc>>,
    /// When the unit was minted.
    pub acquired_at: DateTime<Utc>,
}

/// Insert payload for minting one inventory unit.
#[derive(Debug, Clone)]
pub struct NewInventoryUnit {
    /// Owning user.
    pub user_id: UserId,
    /// Product being minted.
    pub product_id: ProductId,
    /// Minting purchase.
    pub transaction_id: Uuid,
    /// Pre-generated unique token.
    pub token_id: String,
    /// Per-unit price snapshot.
    pub price: PriceTag,
    /// Payment method snapshot.
    pub payment_method: PaymentMethod,
}

/// Stock state after a conditional stock update.
#[derive(Debug, Clone, Copy)]
pub struct StockLevel {
    /// Remaining stock; `None` for unlimited-stock products.
    pub remaining: Option<i64>,
    /// Cumulative sold count after the update.
    pub total_sold: i64,
}

/// A shipping record row from the `shipping_records` table, one per
/// shipped inventory unit.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShippingRecord {
    /// Record identifier.
    pub id: Uuid,
    /// Purchase the shipment belongs to.
    pub transaction_id: Uuid,
    /// Unit being shipped.
    pub inventory_item_id: Uuid,
    /// Recipient user.
    pub user_id: UserId,
    /// Recipient name.
    pub recipient_name: String,
    /// First address line.
    pub address_line1: String,
    /// Optional second address line.
    pub address_line2: Option<String>,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
    /// Country.
    pub country: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Fulfilment status; created as `pending`.
    pub status: String,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for one shipping record.
#[derive(Debug, Clone)]
pub struct NewShippingRecord {
    /// Purchase the shipment belongs to.
    pub transaction_id: Uuid,
    /// Unit being shipped.
    pub inventory_item_id: Uuid,
    /// Recipient user.
    pub user_id: UserId,
    /// Destination address.
    pub address: ShippingAddress,
}

/// A mission definition row from the `missions` table.
///
/// Missions are configured by the admin CMS; this subsystem reads them
/// and records completions.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mission {
    /// Mission identifier.
    pub id: Uuid,
    /// Trigger discriminator (e.g. `"first_purchase"`).
    pub mission_type: String,
    /// Display name.
    pub name: String,
    /// Jest Coin credited on completion.
    pub reward_amount: i64,
    /// Global completion cap, when capped.
    pub max_completions: Option<i64>,
    /// Completions recorded so far.
    pub completion_count: i64,
    /// Whether one user may complete the mission more than once.
    pub is_repeatable: bool,
    /// Disabled missions never complete.
    pub is_active: bool,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A reward row from the `user_rewards` table; unique per
/// (user, mission) unless the mission is repeatable.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserReward {
    /// Reward identifier.
    pub id: Uuid,
    /// Rewarded user.
    pub user_id: UserId,
    /// Completed mission.
    pub mission_id: Uuid,
    /// Jest Coin amount credited.
    pub reward_amount: i64,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
}

/// A pending cart selection row from the `cart_items` table; one row per
/// (user, product), adds merge quantity.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    /// Cart owner.
    pub user_id: UserId,
    /// Selected product.
    pub product_id: ProductId,
    /// Selected quantity (>= 1).
    pub quantity: i64,
    /// Payment method chosen for this line.
    pub selected_payment_method: PaymentMethod,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last quantity-merge timestamp.
    pub updated_at: DateTime<Utc>,
}
