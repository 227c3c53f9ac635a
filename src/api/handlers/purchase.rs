//! Purchase and checkout endpoint handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CheckoutLineResponse, CheckoutRequest, CheckoutResponse, PurchaseCheckQuery,
    PurchaseCheckResponse, PurchaseHistoryResponse, PurchaseRequestBody, TransactionResponse,
};
use crate::app_state::AppState;
use crate::domain::{ProductId, UserId};
use crate::error::{ErrorResponse, MarketError};

/// `POST /users/:user_id/purchases` — Purchase a product.
///
/// # Errors
///
/// Returns [`MarketError`] on invalid parameters, an unknown product, a
/// payment-policy violation, insufficient stock or balance, or a
/// fulfilment failure.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/purchases",
    tag = "Purchases",
    summary = "Purchase a product",
    description = "Charges the selected payment method, mints per-unit inventory records, and \
                   records the transaction. Failures after the charge are compensated.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Buyer UUID"),
    ),
    request_body = PurchaseRequestBody,
    responses(
        (status = 201, description = "Purchase completed", body = TransactionResponse),
        (status = 400, description = "Invalid purchase parameters", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 409, description = "Payment method or ownership-cap conflict", body = ErrorResponse),
        (status = 422, description = "Insufficient stock or balance", body = ErrorResponse),
    )
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
    Json(body): Json<PurchaseRequestBody>,
) -> Result<impl IntoResponse, MarketError> {
    let tx = state
        .purchase_service
        .purchase_single(UserId::from_uuid(user_id), body.into_domain())
        .await?;
    Ok((StatusCode::CREATED, Json(TransactionResponse::from(tx))))
}

/// `GET /users/:user_id/purchases` — Purchase history.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/purchases",
    tag = "Purchases",
    summary = "List purchase history",
    description = "Returns the user's purchase transactions, newest first, including failed ones.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Buyer UUID"),
    ),
    responses(
        (status = 200, description = "Purchase history", body = PurchaseHistoryResponse),
    )
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let transactions = state
        .purchase_service
        .purchase_history(UserId::from_uuid(user_id))
        .await?;
    let transactions: Vec<TransactionResponse> = transactions
        .into_iter()
        .map(TransactionResponse::from)
        .collect();
    let total = transactions.len();
    Ok(Json(PurchaseHistoryResponse {
        transactions,
        total,
    }))
}

/// `GET /users/:user_id/purchases/check` — Pre-flight purchase check.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on store failure; policy denials
/// are reported in the response body.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/purchases/check",
    tag = "Purchases",
    summary = "Check whether a purchase would be allowed",
    description = "Side-effect-free check of product existence, stock, and the per-user cap. \
                   A passing check does not reserve anything.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Buyer UUID"),
        ("product_id" = uuid::Uuid, Query, description = "Product UUID"),
        ("quantity" = Option<i64>, Query, description = "Units to check for (default 1)"),
    ),
    responses(
        (status = 200, description = "Check result", body = PurchaseCheckResponse),
    )
)]
pub async fn check_purchase(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
    Query(query): Query<PurchaseCheckQuery>,
) -> Result<impl IntoResponse, MarketError> {
    let check = state
        .purchase_service
        .can_purchase(
            UserId::from_uuid(user_id),
            ProductId::from_uuid(query.product_id),
            query.quantity.unwrap_or(1),
        )
        .await?;
    Ok(Json(PurchaseCheckResponse::from(check)))
}

/// `POST /users/:user_id/cart/checkout` — Purchase the whole cart.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] when the cart cannot be read;
/// per-line failures are reported in the response body.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/cart/checkout",
    tag = "Purchases",
    summary = "Check out the cart",
    description = "Attempts every cart line as an independent purchase. Succeeded lines are \
                   removed from the cart; failed lines stay for another attempt.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Buyer UUID"),
    ),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Per-line checkout outcomes", body = CheckoutResponse),
    )
)]
pub async fn checkout_cart(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
    body: Option<Json<CheckoutRequest>>,
) -> Result<impl IntoResponse, MarketError> {
    let shipping_address = body.and_then(|Json(req)| req.shipping_address);
    let outcomes = state
        .purchase_service
        .purchase_cart(UserId::from_uuid(user_id), shipping_address)
        .await?;
    let lines: Vec<CheckoutLineResponse> = outcomes
        .into_iter()
        .map(CheckoutLineResponse::from)
        .collect();
    let succeeded = lines.iter().filter(|l| l.transaction.is_some()).count();
    let failed = lines.len() - succeeded;
    Ok(Json(CheckoutResponse {
        lines,
        succeeded,
        failed,
    }))
}

/// Purchase routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/{user_id}/purchases",
            post(create_purchase).get(list_purchases),
        )
        .route("/users/{user_id}/purchases/check", get(check_purchase))
        .route("/users/{user_id}/cart/checkout", post(checkout_cart))
}
