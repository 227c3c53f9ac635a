//! Fiat payment gateway extension point.
//!
//! Real gateway integration is out of scope for this subsystem; the
//! orchestrator charges the fiat portion of a purchase through this
//! trait and ships with [`NoopGateway`], which settles immediately.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::UserId;
use crate::error::MarketError;

/// Charges the fiat portion of a purchase.
#[async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    /// Charges `amount` (two-decimal currency units) against the user's
    /// payment method for the given transaction.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::PaymentGateway`] when the charge is
    /// declined or the gateway is unreachable; the orchestrator then
    /// compensates the purchase.
    async fn charge(
        &self,
        user_id: UserId,
        transaction_id: Uuid,
        amount: Decimal,
    ) -> Result<(), MarketError>;
}

/// Gateway stub that approves every charge immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGateway;

#[async_trait]
impl PaymentGateway for NoopGateway {
    async fn charge(
        &self,
        user_id: UserId,
        transaction_id: Uuid,
        amount: Decimal,
    ) -> Result<(), MarketError> {
        tracing::debug!(%user_id, %transaction_id, %amount, "noop gateway approved charge");
        Ok(())
    }
}
