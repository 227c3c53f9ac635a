//! Market error types with HTTP status code mapping.
//!
//! [`MarketError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4102,
///     "message": "insufficient balance: required 200, available 50",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`MarketError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category               | HTTP Status                |
/// |-----------|------------------------|----------------------------|
/// | 1000–1999 | Validation             | 400 Bad Request            |
/// | 2000–2999 | Not Found              | 404 Not Found              |
/// | 3000–3999 | Server / Persistence   | 500 Internal Server Error  |
/// | 4000–4099 | Policy                 | 409 Conflict               |
/// | 4100–4199 | Insufficient Resource  | 422 Unprocessable Entity   |
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// Request validation failed (malformed quantity, amount, address).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Product with the given ID was not found or is inactive.
    #[error("product not found or inactive: {0}")]
    ProductNotFound(uuid::Uuid),

    /// Inventory item with the given ID was not found.
    #[error("inventory item not found: {0}")]
    ItemNotFound(uuid::Uuid),

    /// No mission of the requested type exists.
    #[error("mission not found: {0}")]
    MissionNotFound(String),

    /// Requested payment method is not accepted by the product.
    #[error("product {product_id} does not accept payment method {requested}")]
    PaymentMethodMismatch {
        /// Product that rejected the method.
        product_id: uuid::Uuid,
        /// Payment method the caller requested.
        requested: String,
    },

    /// Purchase would push the user past the product's per-user cap.
    #[error("per-user purchase cap of {cap} exceeded for product {product_id}")]
    PerUserCapExceeded {
        /// Product with the cap.
        product_id: uuid::Uuid,
        /// Maximum units one user may own.
        cap: i64,
    },

    /// Mission has already been completed by this user.
    #[error("mission already completed by user")]
    MissionAlreadyCompleted,

    /// Mission is disabled.
    #[error("mission is not active")]
    MissionInactive,

    /// Mission has reached its completion cap.
    #[error("mission has reached its completion cap")]
    MissionFull,

    /// Inventory item was already redeemed; redemption is one-way.
    #[error("inventory item already redeemed: {0}")]
    AlreadyRedeemed(uuid::Uuid),

    /// Product stock cannot cover the requested quantity.
    #[error("insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock {
        /// Product that is short on stock.
        product_id: uuid::Uuid,
        /// Quantity the caller requested.
        requested: i64,
    },

    /// Wallet balance cannot cover the required coin amount.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Jest Coin amount the purchase requires.
        required: i64,
        /// Jest Coin amount the wallet holds.
        available: i64,
    },

    /// External payment gateway rejected or failed the fiat charge.
    #[error("payment gateway error: {0}")]
    PaymentGateway(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A purchase failed mid-sequence and compensation could not fully
    /// reverse the applied steps. The transaction is left in
    /// `compensating` for manual reconciliation.
    #[error("purchase {transaction_id} partially applied: {message}")]
    PartialFailure {
        /// Transaction stuck in the `compensating` state.
        transaction_id: uuid::Uuid,
        /// Description of the step that could not be reversed.
        message: String,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::ProductNotFound(_) => 2001,
            Self::ItemNotFound(_) => 2002,
            Self::MissionNotFound(_) => 2003,
            Self::PaymentMethodMismatch { .. } => 4001,
            Self::PerUserCapExceeded { .. } => 4002,
            Self::MissionAlreadyCompleted => 4003,
            Self::MissionInactive => 4004,
            Self::MissionFull => 4005,
            Self::AlreadyRedeemed(_) => 4006,
            Self::InsufficientStock { .. } => 4101,
            Self::InsufficientBalance { .. } => 4102,
            Self::PaymentGateway(_) => 3002,
            Self::Persistence(_) => 3001,
            Self::PartialFailure { .. } => 3003,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ProductNotFound(_) | Self::ItemNotFound(_) | Self::MissionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::PaymentMethodMismatch { .. }
            | Self::PerUserCapExceeded { .. }
            | Self::MissionAlreadyCompleted
            | Self::MissionInactive
            | Self::MissionFull
            | Self::AlreadyRedeemed(_) => StatusCode::CONFLICT,
            Self::InsufficientStock { .. } | Self::InsufficientBalance { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::PaymentGateway(_)
            | Self::Persistence(_)
            | Self::PartialFailure { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        let err = MarketError::InvalidRequest("quantity must be >= 1".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1001);
    }

    #[test]
    fn policy_errors_map_to_409() {
        let err = MarketError::PaymentMethodMismatch {
            product_id: uuid::Uuid::new_v4(),
            requested: "jestcoin".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), 4001);

        assert_eq!(
            MarketError::MissionAlreadyCompleted.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn insufficiency_errors_map_to_422() {
        let err = MarketError::InsufficientBalance {
            required: 200,
            available: 50,
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), 4102);

        let err = MarketError::InsufficientStock {
            product_id: uuid::Uuid::new_v4(),
            requested: 3,
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), 4101);
    }

    #[test]
    fn partial_failure_maps_to_500() {
        let err = MarketError::PartialFailure {
            transaction_id: uuid::Uuid::new_v4(),
            message: "stock release failed".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), 3003);
    }

    #[test]
    fn api_referenced_types_export_openapi_schemas() {
        use utoipa::PartialSchema;

        // Each of these is named in path annotations or embedded in
        // response DTOs, so its schema must be buildable.
        let _ = ErrorResponse::schema();
        let _ = ErrorBody::schema();
        let _ = crate::domain::PaymentMethod::schema();
        let _ = crate::domain::ShippingAddress::schema();
        let _ = crate::domain::DenyReason::schema();
        let _ = crate::domain::UserId::schema();
        let _ = crate::domain::ProductId::schema();
        let _ = crate::persistence::models::TransactionStatus::schema();
    }
}
