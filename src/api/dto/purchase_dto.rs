//! Purchase and checkout DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    DenyReason, PaymentMethod, ProductId, PurchaseCheck, PurchaseRequest, ShippingAddress,
};
use crate::persistence::models::{Transaction, TransactionStatus};
use crate::service::CartPurchaseOutcome;

/// Request body for `POST /users/:user_id/purchases`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PurchaseRequestBody {
    /// Product to purchase.
    pub product_id: uuid::Uuid,
    /// Units to purchase (>= 1).
    pub quantity: i64,
    /// Payment method to charge with.
    pub payment_method: PaymentMethod,
    /// Retry key; repeated calls with the same key charge once.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Delivery address, required semantics apply to physical goods.
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

impl PurchaseRequestBody {
    /// Converts the body into the domain purchase request.
    #[must_use]
    pub fn into_domain(self) -> PurchaseRequest {
        PurchaseRequest {
            product_id: ProductId::from_uuid(self.product_id),
            quantity: self.quantity,
            payment_method: self.payment_method,
            idempotency_key: self.idempotency_key,
            shipping_address: self.shipping_address,
        }
    }
}

/// Response body describing one purchase transaction.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    /// Transaction identifier.
    pub transaction_id: uuid::Uuid,
    /// Purchased product.
    pub product_id: ProductId,
    /// Units purchased.
    pub quantity: i64,
    /// Jest Coin charged.
    pub amount_jestcoin: i64,
    /// Fiat charged (string-encoded decimal).
    pub amount_money: String,
    /// Payment method used.
    pub payment_method: PaymentMethod,
    /// Saga state of the transaction.
    pub status: TransactionStatus,
    /// Failure description, when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Purchase start timestamp.
    pub created_at: DateTime<Utc>,
    /// Completion timestamp, when completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            product_id: tx.product_id,
            quantity: tx.quantity,
            amount_jestcoin: tx.amount_jestcoin,
            amount_money: tx.amount_money.to_string(),
            payment_method: tx.payment_method,
            status: tx.status,
            error_message: tx.error_message,
            created_at: tx.created_at,
            completed_at: tx.completed_at,
        }
    }
}

/// Response body for `GET /users/:user_id/purchases`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseHistoryResponse {
    /// Transactions, newest first.
    pub transactions: Vec<TransactionResponse>,
    /// Number of transactions returned.
    pub total: usize,
}

/// Query parameters for `GET /users/:user_id/purchases/check`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PurchaseCheckQuery {
    /// Product to check.
    pub product_id: uuid::Uuid,
    /// Units to check for; defaults to 1.
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Response body for `GET /users/:user_id/purchases/check`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseCheckResponse {
    /// Whether the purchase would currently be allowed.
    pub allowed: bool,
    /// Denial reason, when disallowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl From<PurchaseCheck> for PurchaseCheckResponse {
    fn from(check: PurchaseCheck) -> Self {
        Self {
            allowed: check.allowed,
            reason: check.reason,
        }
    }
}

/// Request body for `POST /users/:user_id/cart/checkout`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Delivery address applied to every physical line.
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

/// Outcome of one cart line during checkout.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutLineResponse {
    /// Product the line referred to.
    pub product_id: ProductId,
    /// Units the line requested.
    pub quantity: i64,
    /// The completed transaction, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionResponse>,
    /// Failure description, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<CartPurchaseOutcome> for CheckoutLineResponse {
    fn from(outcome: CartPurchaseOutcome) -> Self {
        Self {
            product_id: outcome.product_id,
            quantity: outcome.quantity,
            transaction: outcome.transaction.map(TransactionResponse::from),
            error: outcome.error,
        }
    }
}

/// Response body for `POST /users/:user_id/cart/checkout`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    /// Per-line outcomes in cart order.
    pub lines: Vec<CheckoutLineResponse>,
    /// Number of lines that completed.
    pub succeeded: usize,
    /// Number of lines that failed.
    pub failed: usize,
}
