//! PostgreSQL implementation of the store traits.
//!
//! The wallet and stock mutations are written as single conditional
//! `UPDATE` statements whose affected-row count signals success, so
//! Postgres row-level locking serialises concurrent writers and a
//! read-modify-write lost update is impossible by construction.

use async_trait::async_trait;
use sqlx::PgPool;
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

const PRODUCT_COLUMNS: &str = "id, name, price_jestcoin, price_money, payment_methods, \
     stock_quantity, unlimited_stock, max_per_user, total_sold, requires_shipping, is_active, \
     created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, product_id, quantity, amount_jestcoin, \
     amount_money, payment_method, status, idempotency_key, metadata, error_message, created_at, \
     completed_at";

const INVENTORY_COLUMNS: &str = "id, user_id, product_id, transaction_id, token_id, \
     price_jestcoin, price_money, payment_method, is_showcased, showcase_order, is_redeemed, \
     redeemed_at, acquired_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the underlying pool (health checks).
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> MarketError {
    MarketError::Persistence(e.to_string())
}

#[async_trait]
impl ProductCatalog for PostgresStore {
    async fn get_active_product(&self, id: ProductId) -> Result<Option<Product>, MarketError> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn list_active_products(
        &self,
        method: Option<PaymentMethod>,
    ) -> Result<Vec<Product>, MarketError> {
        if let Some(method) = method {
            sqlx::query_as::<_, Product>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products \
                 WHERE is_active AND (payment_methods = $1 OR payment_methods = 'hybrid') \
                 ORDER BY created_at DESC"
            ))
            .bind(method)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Product>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await
        }
        .map_err(db_err)
    }
}

#[async_trait]
impl WalletLedger for PostgresStore {
    async fn get_or_create_wallet(&self, user_id: UserId) -> Result<Wallet, MarketError> {
        sqlx::query("INSERT INTO wallets (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        sqlx::query_as::<_, Wallet>(
            "SELECT id, user_id, balance, total_earned, total_spent, created_at, updated_at \
             FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn credit(&self, user_id: UserId, amount: i64) -> Result<i64, MarketError> {
        if amount < 1 {
            return Err(MarketError::InvalidRequest(
                "credit amount must be positive".to_string(),
            ));
        }
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO wallets (id, user_id, balance, total_earned) VALUES ($1, $2, $3, $3) \
             ON CONFLICT (user_id) DO UPDATE SET \
               balance = wallets.balance + EXCLUDED.balance, \
               total_earned = wallets.total_earned + EXCLUDED.total_earned, \
               updated_at = now() \
             RETURNING balance",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn debit(&self, user_id: UserId, amount: i64) -> Result<i64, MarketError> {
        if amount < 1 {
            return Err(MarketError::InvalidRequest(
                "debit amount must be positive".to_string(),
            ));
        }
        // The balance guard lives inside the UPDATE; zero affected rows
        // means the wallet cannot cover the amount right now.
        let new_balance = sqlx::query_scalar::<_, i64>(
            "UPDATE wallets SET \
               balance = balance - $2, \
               total_spent = total_spent + $2, \
               updated_at = now() \
             WHERE user_id = $1 AND balance >= $2 \
             RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match new_balance {
            Some(balance) => Ok(balance),
            None => {
                let available = sqlx::query_scalar::<_, i64>(
                    "SELECT balance FROM wallets WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?
                .unwrap_or(0);
                Err(MarketError::InsufficientBalance {
                    required: amount,
                    available,
                })
            }
        }
    }

    async fn refund(&self, user_id: UserId, amount: i64) -> Result<i64, MarketError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE wallets SET \
               balance = balance + $2, \
               total_spent = GREATEST(total_spent - $2, 0), \
               updated_at = now() \
             WHERE user_id = $1 \
             RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| {
            MarketError::Persistence(format!("wallet missing while refunding user {user_id}"))
        })
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn mint_unit(&self, unit: NewInventoryUnit) -> Result<InventoryItem, MarketError> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "INSERT INTO inventory_items \
               (id, user_id, product_id, transaction_id, token_id, price_jestcoin, price_money, \
                payment_method) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(unit.user_id)
        .bind(unit.product_id)
        .bind(unit.transaction_id)
        .bind(&unit.token_id)
        .bind(unit.price.jestcoin)
        .bind(unit.price.money)
        .bind(unit.payment_method)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn list_inventory(&self, user_id: UserId) -> Result<Vec<InventoryItem>, MarketError> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_items WHERE user_id = $1 \
             ORDER BY acquired_at ASC, token_id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn count_units(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<i64, MarketError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inventory_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn set_showcase(
        &self,
        item_id: Uuid,
        showcased: bool,
        order: Option<i32>,
    ) -> Result<InventoryItem, MarketError> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "UPDATE inventory_items SET is_showcased = $2, showcase_order = $3 WHERE id = $1 \
             RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(item_id)
        .bind(showcased)
        .bind(order)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(MarketError::ItemNotFound(item_id))
    }

    async fn redeem(&self, item_id: Uuid) -> Result<InventoryItem, MarketError> {
        let updated = sqlx::query_as::<_, InventoryItem>(&format!(
            "UPDATE inventory_items SET is_redeemed = TRUE, redeemed_at = now() \
             WHERE id = $1 AND NOT is_redeemed \
             RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        if let Some(item) = updated {
            return Ok(item);
        }
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT is_redeemed FROM inventory_items WHERE id = $1")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        match exists {
            Some(_) => Err(MarketError::AlreadyRedeemed(item_id)),
            None => Err(MarketError::ItemNotFound(item_id)),
        }
    }

    async fn void_units(&self, transaction_id: Uuid) -> Result<u64, MarketError> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE transaction_id = $1")
            .bind(transaction_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StockCounter for PostgresStore {
    async fn reserve_and_record_sale(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<StockLevel, MarketError> {
        // Stock is re-read inside the UPDATE itself; a stale earlier read
        // can never oversell.
        let row = sqlx::query_as::<_, (i64, bool, i64)>(
            "UPDATE products SET \
               stock_quantity = CASE WHEN unlimited_stock THEN stock_quantity \
                                     ELSE stock_quantity - $2 END, \
               total_sold = total_sold + $2, \
               updated_at = now() \
             WHERE id = $1 AND (unlimited_stock OR stock_quantity >= $2) \
             RETURNING stock_quantity, unlimited_stock, total_sold",
        )
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some((stock_quantity, unlimited_stock, total_sold)) => Ok(StockLevel {
                remaining: (!unlimited_stock).then_some(stock_quantity),
                total_sold,
            }),
            None => Err(MarketError::InsufficientStock {
                product_id: (*product_id.as_uuid()),
                requested: quantity,
            }),
        }
    }

    async fn release_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), MarketError> {
        sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = now() \
             WHERE id = $1 AND NOT unlimited_stock",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl TransactionLog for PostgresStore {
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, MarketError> {
        let inserted = sqlx::query_as::<_, Transaction>(&format!(
            "INSERT INTO transactions \
               (id, user_id, product_id, quantity, amount_jestcoin, amount_money, \
                payment_method, status, idempotency_key, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9) \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(tx.user_id)
        .bind(tx.product_id)
        .bind(tx.quantity)
        .bind(tx.amount_jestcoin)
        .bind(tx.amount_money)
        .bind(tx.payment_method)
        .bind(&tx.idempotency_key)
        .bind(&tx.metadata)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(row),
            // A retry racing the idempotency pre-check trips the partial
            // unique index on (user_id, idempotency_key); hand back the
            // transaction the winner recorded.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                if let Some(key) = &tx.idempotency_key {
                    if let Some(existing) = self.find_by_idempotency_key(tx.user_id, key).await? {
                        return Ok(existing);
                    }
                }
                Err(MarketError::Persistence(db.to_string()))
            }
            Err(err) => Err(db_err(err)),
        }
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Transaction>, MarketError> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE user_id = $1 AND idempotency_key = $2"
        ))
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn set_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), MarketError> {
        let result = sqlx::query(
            "UPDATE transactions SET status = $2 \
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind(transaction_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(MarketError::Persistence(format!(
                "transaction {transaction_id} missing or already terminal"
            )));
        }
        Ok(())
    }

    async fn mark_completed(&self, transaction_id: Uuid) -> Result<Transaction, MarketError> {
        sqlx::query_as::<_, Transaction>(&format!(
            "UPDATE transactions SET status = 'completed', completed_at = now() \
             WHERE id = $1 AND status NOT IN ('completed', 'failed') \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| {
            MarketError::Persistence(format!(
                "transaction {transaction_id} missing or already terminal"
            ))
        })
    }

    async fn mark_failed(&self, transaction_id: Uuid, error: &str) -> Result<(), MarketError> {
        let result = sqlx::query(
            "UPDATE transactions SET status = 'failed', error_message = $2 \
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind(transaction_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(MarketError::Persistence(format!(
                "transaction {transaction_id} missing or already terminal"
            )));
        }
        Ok(())
    }

    async fn purchase_history(&self, user_id: UserId) -> Result<Vec<Transaction>, MarketError> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn count_completed(&self, user_id: UserId) -> Result<i64, MarketError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transactions WHERE user_id = $1 AND status = 'completed'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl ShippingLog for PostgresStore {
    async fn insert_shipping_record(
        &self,
        record: NewShippingRecord,
    ) -> Result<ShippingRecord, MarketError> {
        sqlx::query_as::<_, ShippingRecord>(
            "INSERT INTO shipping_records \
               (id, transaction_id, inventory_item_id, user_id, recipient_name, address_line1, \
                address_line2, city, state, postal_code, country, phone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING id, transaction_id, inventory_item_id, user_id, recipient_name, \
               address_line1, address_line2, city, state, postal_code, country, phone, status, \
               created_at",
        )
        .bind(Uuid::new_v4())
        .bind(record.transaction_id)
        .bind(record.inventory_item_id)
        .bind(record.user_id)
        .bind(&record.address.recipient_name)
        .bind(&record.address.address_line1)
        .bind(&record.address.address_line2)
        .bind(&record.address.city)
        .bind(&record.address.state)
        .bind(&record.address.postal_code)
        .bind(&record.address.country)
        .bind(&record.address.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn add_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        method: PaymentMethod,
    ) -> Result<CartItem, MarketError> {
        sqlx::query_as::<_, CartItem>(
            "INSERT INTO cart_items (user_id, product_id, quantity, selected_payment_method) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET \
               quantity = cart_items.quantity + EXCLUDED.quantity, \
               selected_payment_method = EXCLUDED.selected_payment_method, \
               updated_at = now() \
             RETURNING user_id, product_id, quantity, selected_payment_method, created_at, \
               updated_at",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(method)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), MarketError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), MarketError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, MarketError> {
        sqlx::query_as::<_, CartItem>(
            "SELECT user_id, product_id, quantity, selected_payment_method, created_at, \
               updated_at \
             FROM cart_items WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

const MISSION_COLUMNS: &str = "id, mission_type, name, reward_amount, max_completions, \
     completion_count, is_repeatable, is_active, created_at";

#[async_trait]
impl MissionStore for PostgresStore {
    async fn mission_by_type(&self, mission_type: &str) -> Result<Option<Mission>, MarketError> {
        sqlx::query_as::<_, Mission>(&format!(
            "SELECT {MISSION_COLUMNS} FROM missions WHERE mission_type = $1 \
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(mission_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn complete_mission(
        &self,
        user_id: UserId,
        mission_id: Uuid,
    ) -> Result<UserReward, MarketError> {
        // Reward insert, completion counter and wallet credit commit as
        // one unit; the row lock on the mission serialises concurrent
        // completions against the cap.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let mission = sqlx::query_as::<_, Mission>(&format!(
            "SELECT {MISSION_COLUMNS} FROM missions WHERE id = $1 FOR UPDATE"
        ))
        .bind(mission_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or_else(|| MarketError::MissionNotFound(mission_id.to_string()))?;

        if !mission.is_active {
            return Err(MarketError::MissionInactive);
        }
        if let Some(cap) = mission.max_completions {
            if mission.completion_count >= cap {
                return Err(MarketError::MissionFull);
            }
        }
        if !mission.is_repeatable {
            let already = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM user_rewards WHERE user_id = $1 AND mission_id = $2)",
            )
            .bind(user_id)
            .bind(mission_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
            if already {
                return Err(MarketError::MissionAlreadyCompleted);
            }
        }

        let reward = sqlx::query_as::<_, UserReward>(
            "INSERT INTO user_rewards (id, user_id, mission_id, reward_amount) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, mission_id, reward_amount, completed_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(mission_id)
        .bind(mission.reward_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("UPDATE missions SET completion_count = completion_count + 1 WHERE id = $1")
            .bind(mission_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query(
            "INSERT INTO wallets (id, user_id, balance, total_earned) VALUES ($1, $2, $3, $3) \
             ON CONFLICT (user_id) DO UPDATE SET \
               balance = wallets.balance + EXCLUDED.balance, \
               total_earned = wallets.total_earned + EXCLUDED.total_earned, \
               updated_at = now()",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(mission.reward_amount)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(reward)
    }
}
