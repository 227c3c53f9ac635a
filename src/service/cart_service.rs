//! Cart management: line merging and dual-currency totals.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::payment::{coin_due, money_due};
use crate::domain::{PaymentMethod, ProductId, UserId};
use crate::error::MarketError;
use crate::persistence::models::CartItem;
use crate::persistence::store::{CartStore, ProductCatalog};

/// Dual-currency cart totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    /// Jest Coin total across all lines.
    pub total_jestcoin: i64,
    /// Fiat total across all lines.
    pub total_money: Decimal,
    /// Total number of units in the cart.
    pub item_count: i64,
}

/// Cart operations over any [`CartStore`] + [`ProductCatalog`].
#[derive(Debug)]
pub struct CartService<S> {
    store: Arc<S>,
}

impl<S> CartService<S>
where
    S: CartStore + ProductCatalog + Send + Sync,
{
    /// Creates a new `CartService`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Adds a product to the cart, merging the quantity into an existing
    /// line for the same product.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidRequest`] for quantities below one,
    /// [`MarketError::ProductNotFound`] for unknown or inactive products,
    /// [`MarketError::PaymentMethodMismatch`] when the product does not
    /// accept the selected method, and [`MarketError::Persistence`] on
    /// store failure.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        method: PaymentMethod,
    ) -> Result<CartItem, MarketError> {
        if quantity < 1 {
            return Err(MarketError::InvalidRequest(
                "quantity must be at least 1".to_string(),
            ));
        }
        let product = self
            .store
            .get_active_product(product_id)
            .await?
            .ok_or_else(|| MarketError::ProductNotFound(*product_id.as_uuid()))?;
        if !product.payment_methods.accepts(method) {
            return Err(MarketError::PaymentMethodMismatch {
                product_id: *product_id.as_uuid(),
                requested: method.to_string(),
            });
        }
        self.store
            .add_cart_item(user_id, product_id, quantity, method)
            .await
    }

    /// Removes one product line from the cart.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), MarketError> {
        self.store.remove_cart_item(user_id, product_id).await
    }

    /// Empties the cart.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    pub async fn clear(&self, user_id: UserId) -> Result<(), MarketError> {
        self.store.clear_cart(user_id).await
    }

    /// Lists the cart lines.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    pub async fn items(&self, user_id: UserId) -> Result<Vec<CartItem>, MarketError> {
        self.store.cart_items(user_id).await
    }

    /// Sums coin and money totals across the cart, splitting
    /// hybrid-selected lines' cost across both currencies, and counts
    /// units.
    ///
    /// Lines whose product has gone missing or inactive since being
    /// added contribute nothing; checkout surfaces those failures.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Persistence`] on store failure.
    pub async fn compute_totals(&self, user_id: UserId) -> Result<CartTotals, MarketError> {
        let lines = self.store.cart_items(user_id).await?;
        let mut totals = CartTotals {
            total_jestcoin: 0,
            total_money: Decimal::ZERO,
            item_count: 0,
        };
        for line in lines {
            let Some(product) = self.store.get_active_product(line.product_id).await? else {
                tracing::debug!(
                    user_id = %user_id,
                    product_id = %line.product_id,
                    "skipping stale cart line in totals"
                );
                continue;
            };
            let price = product.price();
            totals.total_jestcoin +=
                coin_due(&price, line.selected_payment_method, line.quantity);
            totals.total_money += money_due(&price, line.selected_payment_method, line.quantity);
            totals.item_count += line.quantity;
        }
        Ok(totals)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::persistence::models::Product;
    use chrono::Utc;

    fn make_product(coin: i64, cents: i64, methods: PaymentMethod) -> Product {
        Product {
            id: ProductId::new(),
            name: "Tour Tee".to_string(),
            price_jestcoin: coin,
            price_money: Decimal::new(cents, 2),
            payment_methods: methods,
            stock_quantity: 100,
            unlimited_stock: false,
            max_per_user: None,
            total_sold: 0,
            requires_shipping: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn seeded(products: Vec<Product>) -> (Arc<MemoryStore>, CartService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for p in products {
            store.insert_product(p).await;
        }
        let service = CartService::new(Arc::clone(&store));
        (store, service)
    }

    #[tokio::test]
    async fn add_merges_quantity_for_same_product() {
        let product = make_product(100, 500, PaymentMethod::Hybrid);
        let product_id = product.id;
        let (_, service) = seeded(vec![product]).await;
        let user = UserId::new();

        let first = service
            .add_item(user, product_id, 2, PaymentMethod::Jestcoin)
            .await;
        assert!(first.is_ok());
        let merged = service
            .add_item(user, product_id, 3, PaymentMethod::Jestcoin)
            .await;
        let Ok(merged) = merged else {
            panic!("add failed");
        };
        assert_eq!(merged.quantity, 5);

        let items = service.items(user).await;
        let Ok(items) = items else {
            panic!("list failed");
        };
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn add_rejects_unsupported_method() {
        let product = make_product(0, 999, PaymentMethod::Money);
        let product_id = product.id;
        let (_, service) = seeded(vec![product]).await;

        let result = service
            .add_item(UserId::new(), product_id, 1, PaymentMethod::Jestcoin)
            .await;
        assert!(matches!(
            result,
            Err(MarketError::PaymentMethodMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn totals_split_hybrid_lines_across_both_currencies() {
        let coin_product = make_product(100, 0, PaymentMethod::Jestcoin);
        let hybrid_product = make_product(100, 500, PaymentMethod::Hybrid);
        let coin_id = coin_product.id;
        let hybrid_id = hybrid_product.id;
        let (_, service) = seeded(vec![coin_product, hybrid_product]).await;
        let user = UserId::new();

        let a = service.add_item(user, coin_id, 2, PaymentMethod::Jestcoin).await;
        assert!(a.is_ok());
        let b = service.add_item(user, hybrid_id, 1, PaymentMethod::Hybrid).await;
        assert!(b.is_ok());

        let totals = service.compute_totals(user).await;
        let Ok(totals) = totals else {
            panic!("totals failed");
        };
        // 2 x 100 coin + half of 100 coin = 250; half of 5.00 = 2.50
        assert_eq!(totals.total_jestcoin, 250);
        assert_eq!(totals.total_money, Decimal::new(250, 2));
        assert_eq!(totals.item_count, 3);
    }

    #[tokio::test]
    async fn remove_and_clear_empty_the_cart() {
        let product = make_product(10, 0, PaymentMethod::Jestcoin);
        let product_id = product.id;
        let (_, service) = seeded(vec![product]).await;
        let user = UserId::new();

        let added = service
            .add_item(user, product_id, 1, PaymentMethod::Jestcoin)
            .await;
        assert!(added.is_ok());

        let removed = service.remove_item(user, product_id).await;
        assert!(removed.is_ok());
        let items = service.items(user).await;
        let Ok(items) = items else {
            panic!("list failed");
        };
        assert!(items.is_empty());
    }
}
