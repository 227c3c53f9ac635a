//! Product catalog DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{PaymentMethod, ProductId};
use crate::persistence::models::Product;

/// Query parameters for `GET /products`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductListQuery {
    /// Only return products accepting this payment method.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// Response body describing one purchasable product.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Jest Coin price per unit.
    pub price_jestcoin: i64,
    /// Fiat price per unit (string-encoded decimal).
    pub price_money: String,
    /// Accepted payment methods.
    pub payment_methods: PaymentMethod,
    /// Remaining stock; absent for unlimited-stock products.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    /// Whether the product skips stock accounting.
    pub unlimited_stock: bool,
    /// Per-user ownership cap, when capped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_per_user: Option<i64>,
    /// Cumulative units sold.
    pub total_sold: i64,
    /// Whether purchases create shipping records.
    pub requires_shipping: bool,
    /// Catalog listing timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            price_jestcoin: p.price_jestcoin,
            price_money: p.price_money.to_string(),
            payment_methods: p.payment_methods,
            stock_quantity: (!p.unlimited_stock).then_some(p.stock_quantity),
            unlimited_stock: p.unlimited_stock,
            max_per_user: p.max_per_user,
            total_sold: p.total_sold,
            requires_shipping: p.requires_shipping,
            created_at: p.created_at,
        }
    }
}
