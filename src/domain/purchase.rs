//! Purchase request and pre-flight check types.

use serde::{Deserialize, Serialize};

use super::ids::ProductId;
use super::payment::PaymentMethod;
use crate::error::MarketError;

/// A single-item purchase request as accepted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Product to purchase.
    pub product_id: ProductId,
    /// Number of units (>= 1).
    pub quantity: i64,
    /// How the purchase is paid.
    pub payment_method: PaymentMethod,
    /// Caller-supplied key making retries of the same logical purchase
    /// safe: a transaction already recorded under this key is returned
    /// as-is instead of charging again.
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Destination for physical goods; required by shipping products.
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

impl PurchaseRequest {
    /// Validates the request shape before any store access.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidRequest`] when the quantity is below
    /// one or a supplied shipping address is missing required fields.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.quantity < 1 {
            return Err(MarketError::InvalidRequest(
                "quantity must be at least 1".to_string(),
            ));
        }
        if let Some(addr) = &self.shipping_address {
            addr.validate()?;
        }
        Ok(())
    }
}

/// Shipping destination captured with a purchase of physical goods.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ShippingAddress {
    /// Name of the person receiving the shipment.
    pub recipient_name: String,
    /// First address line.
    pub address_line1: String,
    /// Optional second address line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
    /// ISO country name or code.
    pub country: String,
    /// Optional contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Rejects addresses with blank required fields.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidRequest`] naming the first blank
    /// field.
    pub fn validate(&self) -> Result<(), MarketError> {
        let required = [
            ("recipient_name", &self.recipient_name),
            ("address_line1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(MarketError::InvalidRequest(format!(
                    "shipping address field `{name}` must not be blank"
                )));
            }
        }
        Ok(())
    }
}

/// Result of the side-effect-free purchase pre-flight check.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseCheck {
    /// Whether a purchase with these parameters would pass validation.
    pub allowed: bool,
    /// Machine-readable denial reason when `allowed` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl PurchaseCheck {
    /// An allowing check result.
    #[must_use]
    pub const fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// A denying check result with the given reason.
    #[must_use]
    pub const fn denied(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Why a pre-flight purchase check denied the purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The product does not exist or is inactive.
    ProductNotFound,
    /// Requested quantity is below one.
    InvalidQuantity,
    /// Finite stock cannot cover the quantity.
    InsufficientStock,
    /// The purchase would exceed the product's per-user cap.
    PerUserCapExceeded,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn request(quantity: i64) -> PurchaseRequest {
        PurchaseRequest {
            product_id: ProductId::new(),
            quantity,
            payment_method: PaymentMethod::Jestcoin,
            idempotency_key: None,
            shipping_address: None,
        }
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(request(0).validate().is_err());
        assert!(request(-3).validate().is_err());
        assert!(request(1).validate().is_ok());
    }

    #[test]
    fn blank_address_field_is_rejected() {
        let mut req = request(1);
        req.shipping_address = Some(ShippingAddress {
            recipient_name: "Ada".to_string(),
            address_line1: "1 Main St".to_string(),
            address_line2: None,
            city: "  ".to_string(),
            state: "CA".to_string(),
            postal_code: "90210".to_string(),
            country: "US".to_string(),
            phone: None,
        });
        let Err(MarketError::InvalidRequest(msg)) = req.validate() else {
            panic!("expected InvalidRequest");
        };
        assert!(msg.contains("city"));
    }
}
