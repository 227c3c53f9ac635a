//! System endpoints: health check and payment-method catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Liveness report.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Liveness probe reporting the service name, build version, and server time.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Metadata for one supported payment method.
#[derive(Debug, Serialize, ToSchema)]
struct PaymentMethodInfo {
    method: &'static str,
    description: &'static str,
    uses_jestcoin: bool,
    uses_money: bool,
}

/// `GET /config/payment-methods` — List supported payment methods.
#[utoipa::path(
    get,
    path = "/config/payment-methods",
    tag = "System",
    summary = "List supported payment methods",
    description = "Returns metadata for every payment method a product can accept.",
    responses(
        (status = 200, description = "Payment method catalog", body = Vec<PaymentMethodInfo>),
    )
)]
pub async fn payment_methods_handler() -> impl IntoResponse {
    let methods = vec![
        PaymentMethodInfo {
            method: "jestcoin",
            description: "Jest Coin wallet balance only",
            uses_jestcoin: true,
            uses_money: false,
        },
        PaymentMethodInfo {
            method: "money",
            description: "Fiat charge through the payment gateway",
            uses_jestcoin: false,
            uses_money: true,
        },
        PaymentMethodInfo {
            method: "hybrid",
            description: "Half Jest Coin, half fiat per unit",
            uses_jestcoin: true,
            uses_money: true,
        },
    ];
    (StatusCode::OK, Json(methods))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/payment-methods", get(payment_methods_handler))
}
