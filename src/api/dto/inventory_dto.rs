//! Inventory DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{PaymentMethod, ProductId};
use crate::persistence::models::InventoryItem;

/// Response body describing one owned unit.
#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryItemResponse {
    /// Unit identifier.
    pub item_id: uuid::Uuid,
    /// Product the unit is an instance of.
    pub product_id: ProductId,
    /// Unique ownership token.
    pub token_id: String,
    /// Coin price at purchase time.
    pub price_jestcoin: i64,
    /// Fiat price at purchase time (string-encoded decimal).
    pub price_money: String,
    /// Payment method used at purchase time.
    pub payment_method: PaymentMethod,
    /// Whether the unit is publicly showcased.
    pub is_showcased: bool,
    /// Position among the owner's showcased units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showcase_order: Option<i32>,
    /// Whether the unit has been redeemed.
    pub is_redeemed: bool,
    /// Redemption timestamp, when redeemed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Minting timestamp.
    pub acquired_at: DateTime<Utc>,
}

impl From<InventoryItem> for InventoryItemResponse {
    fn from(item: InventoryItem) -> Self {
        Self {
            item_id: item.id,
            product_id: item.product_id,
            token_id: item.token_id,
            price_jestcoin: item.price_jestcoin,
            price_money: item.price_money.to_string(),
            payment_method: item.payment_method,
            is_showcased: item.is_showcased,
            showcase_order: item.showcase_order,
            is_redeemed: item.is_redeemed,
            redeemed_at: item.redeemed_at,
            acquired_at: item.acquired_at,
        }
    }
}

/// Response body for `GET /users/:user_id/inventory`.
#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryResponse {
    /// Owned units, oldest acquisition first.
    pub items: Vec<InventoryItemResponse>,
    /// Number of units returned.
    pub total: usize,
}

/// Request body for `PATCH /inventory/:item_id/showcase`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ShowcaseRequest {
    /// New showcase visibility.
    pub is_showcased: bool,
    /// Display position; ignored when hiding.
    #[serde(default)]
    pub showcase_order: Option<i32>,
}
