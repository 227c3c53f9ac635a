//! Cart DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{PaymentMethod, ProductId};
use crate::persistence::models::CartItem;
use crate::service::CartTotals;

/// Request body for `POST /users/:user_id/cart/items`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    /// Product to add.
    pub product_id: uuid::Uuid,
    /// Units to add (>= 1); merges into an existing line.
    pub quantity: i64,
    /// Payment method selected for this line.
    pub payment_method: PaymentMethod,
}

/// Response body describing one cart line.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    /// Selected product.
    pub product_id: ProductId,
    /// Selected quantity.
    pub quantity: i64,
    /// Payment method chosen for this line.
    pub payment_method: PaymentMethod,
    /// Last quantity-merge timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<CartItem> for CartItemResponse {
    fn from(line: CartItem) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            payment_method: line.selected_payment_method,
            updated_at: line.updated_at,
        }
    }
}

/// Dual-currency cart totals.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartTotalsResponse {
    /// Jest Coin total across all lines.
    pub total_jestcoin: i64,
    /// Fiat total across all lines (string-encoded decimal).
    pub total_money: String,
    /// Total units in the cart.
    pub item_count: i64,
}

impl From<CartTotals> for CartTotalsResponse {
    fn from(totals: CartTotals) -> Self {
        Self {
            total_jestcoin: totals.total_jestcoin,
            total_money: totals.total_money.to_string(),
            item_count: totals.item_count,
        }
    }
}

/// Response body for `GET /users/:user_id/cart`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    /// Cart lines, oldest first.
    pub items: Vec<CartItemResponse>,
    /// Totals over the current lines.
    pub totals: CartTotalsResponse,
}
