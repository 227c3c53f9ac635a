//! Wallet DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::UserId;
use crate::persistence::models::Wallet;

/// Response body for `GET /users/:user_id/wallet`.
#[derive(Debug, Serialize, ToSchema)]
pub struct WalletResponse {
    /// Wallet owner.
    pub user_id: UserId,
    /// Current Jest Coin balance.
    pub balance: i64,
    /// Lifetime coin credited.
    pub total_earned: i64,
    /// Lifetime coin spent.
    pub total_spent: i64,
    /// Last balance change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(w: Wallet) -> Self {
        Self {
            user_id: w.user_id,
            balance: w.balance,
            total_earned: w.total_earned,
            total_spent: w.total_spent,
            updated_at: w.updated_at,
        }
    }
}
