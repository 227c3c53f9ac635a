//! Cart endpoint handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{AddCartItemRequest, CartItemResponse, CartResponse, CartTotalsResponse};
use crate::app_state::AppState;
use crate::domain::{ProductId, UserId};
use crate::error::{ErrorResponse, MarketError};

/// `GET /users/:user_id/cart` — Cart contents and totals.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/cart",
    tag = "Cart",
    summary = "Get cart contents",
    description = "Returns the user's cart lines together with dual-currency totals computed \
                   from current catalog prices.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Cart owner UUID"),
    ),
    responses(
        (status = 200, description = "Cart contents", body = CartResponse),
    )
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let user_id = UserId::from_uuid(user_id);
    let items = state.cart_service.items(user_id).await?;
    let totals = state.cart_service.compute_totals(user_id).await?;
    Ok(Json(CartResponse {
        items: items.into_iter().map(CartItemResponse::from).collect(),
        totals: CartTotalsResponse::from(totals),
    }))
}

/// `POST /users/:user_id/cart/items` — Add a product to the cart.
///
/// # Errors
///
/// Returns [`MarketError::InvalidRequest`] for quantities below one,
/// [`MarketError::ProductNotFound`] for unknown products,
/// [`MarketError::PaymentMethodMismatch`] for unsupported methods, and
/// [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/cart/items",
    tag = "Cart",
    summary = "Add a product to the cart",
    description = "Adds a product line to the cart. Adding a product already in the cart merges \
                   the quantities and keeps the most recent payment method.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Cart owner UUID"),
    ),
    request_body = AddCartItemRequest,
    responses(
        (status = 201, description = "Cart line after the merge", body = CartItemResponse),
        (status = 400, description = "Invalid quantity", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 409, description = "Payment method not accepted", body = ErrorResponse),
    )
)]
pub async fn add_cart_item(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
    Json(body): Json<AddCartItemRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let line = state
        .cart_service
        .add_item(
            UserId::from_uuid(user_id),
            ProductId::from_uuid(body.product_id),
            body.quantity,
            body.payment_method,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(CartItemResponse::from(line))))
}

/// `DELETE /users/:user_id/cart/items/:product_id` — Remove a cart line.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/cart/items/{product_id}",
    tag = "Cart",
    summary = "Remove a product from the cart",
    description = "Removes one product line regardless of quantity. Removing an absent line is \
                   a no-op.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Cart owner UUID"),
        ("product_id" = uuid::Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 204, description = "Line removed"),
    )
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<impl IntoResponse, MarketError> {
    state
        .cart_service
        .remove_item(UserId::from_uuid(user_id), ProductId::from_uuid(product_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /users/:user_id/cart` — Empty the cart.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}/cart",
    tag = "Cart",
    summary = "Empty the cart",
    description = "Removes every line from the user's cart.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Cart owner UUID"),
    ),
    responses(
        (status = 204, description = "Cart emptied"),
    )
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    state.cart_service.clear(UserId::from_uuid(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cart routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/cart", get(get_cart).delete(clear_cart))
        .route("/users/{user_id}/cart/items", post(add_cart_item))
        .route(
            "/users/{user_id}/cart/items/{product_id}",
            delete(remove_cart_item),
        )
}
