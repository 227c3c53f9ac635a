//! Payment methods and dual-currency price math.
//!
//! Every product carries two prices: a Jest Coin price (integer) and a
//! fiat price (two-decimal currency units). The payment method chosen at
//! purchase time decides which of the two ledgers is charged; `hybrid`
//! splits the cost at exactly half of each price.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Payment method for a purchase, and simultaneously the set of methods
/// a product accepts (`hybrid` products accept all three).
///
/// Stored as lowercase TEXT in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Pay the full Jest Coin price from the wallet.
    Jestcoin,
    /// Pay the full fiat price through the payment gateway.
    Money,
    /// Pay half the coin price and half the fiat price.
    Hybrid,
}

impl PaymentMethod {
    /// Returns the lowercase string form used on the wire and in the
    /// database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jestcoin => "jestcoin",
            Self::Money => "money",
            Self::Hybrid => "hybrid",
        }
    }

    /// Whether a product restricted to `self` accepts a purchase paid
    /// with `requested`.
    ///
    /// `jestcoin`-only and `money`-only products accept exactly their own
    /// method; `hybrid` products accept any method.
    #[must_use]
    pub const fn accepts(self, requested: Self) -> bool {
        match self {
            Self::Hybrid => true,
            Self::Jestcoin => matches!(requested, Self::Jestcoin),
            Self::Money => matches!(requested, Self::Money),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-unit price snapshot: a coin price and a fiat price side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTag {
    /// Jest Coin price (non-negative).
    pub jestcoin: i64,
    /// Fiat price in two-decimal currency units.
    pub money: Decimal,
}

/// Jest Coin amount due for `quantity` units paid with `method`.
///
/// Hybrid takes half the per-unit coin price, rounded up so the split
/// never undercharges the coin side of an odd price.
#[must_use]
pub fn coin_due(price: &PriceTag, method: PaymentMethod, quantity: i64) -> i64 {
    let per_unit = match method {
        PaymentMethod::Jestcoin => price.jestcoin,
        // Round the half up; prices are non-negative.
        PaymentMethod::Hybrid => (price.jestcoin + 1) / 2,
        PaymentMethod::Money => 0,
    };
    per_unit.saturating_mul(quantity)
}

/// Fiat amount due for `quantity` units paid with `method`.
///
/// Hybrid takes half the per-unit fiat price, rounded to two decimals
/// away from zero on midpoints.
#[must_use]
pub fn money_due(price: &PriceTag, method: PaymentMethod, quantity: i64) -> Decimal {
    let per_unit = match method {
        PaymentMethod::Money => price.money,
        PaymentMethod::Hybrid => (price.money / Decimal::from(2))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        PaymentMethod::Jestcoin => Decimal::ZERO,
    };
    per_unit * Decimal::from(quantity)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn tag(coin: i64, cents: i64) -> PriceTag {
        PriceTag {
            jestcoin: coin,
            money: Decimal::new(cents, 2),
        }
    }

    #[test]
    fn jestcoin_method_charges_full_coin_price() {
        let price = tag(100, 500);
        assert_eq!(coin_due(&price, PaymentMethod::Jestcoin, 2), 200);
        assert_eq!(money_due(&price, PaymentMethod::Jestcoin, 2), Decimal::ZERO);
    }

    #[test]
    fn money_method_charges_full_fiat_price() {
        let price = tag(100, 500);
        assert_eq!(coin_due(&price, PaymentMethod::Money, 3), 0);
        assert_eq!(money_due(&price, PaymentMethod::Money, 3), Decimal::new(1500, 2));
    }

    #[test]
    fn hybrid_splits_both_prices_in_half() {
        let price = tag(100, 500);
        assert_eq!(coin_due(&price, PaymentMethod::Hybrid, 1), 50);
        assert_eq!(money_due(&price, PaymentMethod::Hybrid, 1), Decimal::new(250, 2));
    }

    #[test]
    fn hybrid_rounds_odd_coin_price_up() {
        let price = tag(101, 0);
        assert_eq!(coin_due(&price, PaymentMethod::Hybrid, 1), 51);
    }

    #[test]
    fn hybrid_halves_even_and_zero_coin_prices_exactly() {
        assert_eq!(coin_due(&tag(100, 0), PaymentMethod::Hybrid, 3), 150);
        assert_eq!(coin_due(&tag(0, 0), PaymentMethod::Hybrid, 5), 0);
        assert_eq!(coin_due(&tag(1, 0), PaymentMethod::Hybrid, 1), 1);
    }

    #[test]
    fn hybrid_rounds_fiat_midpoints_away_from_zero() {
        // 0.05 / 2 = 0.025 -> 0.03
        let price = tag(0, 5);
        assert_eq!(money_due(&price, PaymentMethod::Hybrid, 1), Decimal::new(3, 2));
    }

    #[test]
    fn restricted_products_accept_only_their_method() {
        assert!(PaymentMethod::Jestcoin.accepts(PaymentMethod::Jestcoin));
        assert!(!PaymentMethod::Jestcoin.accepts(PaymentMethod::Money));
        assert!(!PaymentMethod::Jestcoin.accepts(PaymentMethod::Hybrid));
        assert!(!PaymentMethod::Money.accepts(PaymentMethod::Jestcoin));
        assert!(PaymentMethod::Money.accepts(PaymentMethod::Money));
        assert!(PaymentMethod::Hybrid.accepts(PaymentMethod::Jestcoin));
        assert!(PaymentMethod::Hybrid.accepts(PaymentMethod::Money));
        assert!(PaymentMethod::Hybrid.accepts(PaymentMethod::Hybrid));
    }

    #[test]
    fn serde_uses_snake_case_strings() {
        let json = serde_json::to_string(&PaymentMethod::Jestcoin).ok();
        assert_eq!(json.as_deref(), Some("\"jestcoin\""));
    }
}
