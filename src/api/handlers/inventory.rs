//! Inventory endpoint handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::dto::{InventoryItemResponse, InventoryResponse, ShowcaseRequest};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, MarketError};
use crate::persistence::store::InventoryStore;

/// `GET /users/:user_id/inventory` — Owned units.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/inventory",
    tag = "Inventory",
    summary = "List owned units",
    description = "Returns every unit the user owns, oldest acquisition first, including \
                   redeemed units.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Owner UUID"),
    ),
    responses(
        (status = 200, description = "Owned units", body = InventoryResponse),
    )
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let items = state
        .store
        .list_inventory(UserId::from_uuid(user_id))
        .await?;
    let items: Vec<InventoryItemResponse> =
        items.into_iter().map(InventoryItemResponse::from).collect();
    let total = items.len();
    Ok(Json(InventoryResponse { items, total }))
}

/// `PATCH /inventory/:item_id/showcase` — Set showcase visibility.
///
/// # Errors
///
/// Returns [`MarketError::ItemNotFound`] for unknown units and
/// [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    patch,
    path = "/api/v1/inventory/{item_id}/showcase",
    tag = "Inventory",
    summary = "Set showcase visibility of a unit",
    description = "Shows or hides a unit on the owner's public showcase and sets its display \
                   position.",
    params(
        ("item_id" = uuid::Uuid, Path, description = "Unit UUID"),
    ),
    request_body = ShowcaseRequest,
    responses(
        (status = 200, description = "Updated unit", body = InventoryItemResponse),
        (status = 404, description = "Unit not found", body = ErrorResponse),
    )
)]
pub async fn set_showcase(
    State(state): State<AppState>,
    Path(item_id): Path<uuid::Uuid>,
    Json(body): Json<ShowcaseRequest>,
) -> Result<impl IntoResponse, MarketError> {
    let order = body.is_showcased.then_some(body.showcase_order).flatten();
    let item = state
        .store
        .set_showcase(item_id, body.is_showcased, order)
        .await?;
    Ok(Json(InventoryItemResponse::from(item)))
}

/// `POST /inventory/:item_id/redeem` — Redeem a unit.
///
/// # Errors
///
/// Returns [`MarketError::ItemNotFound`] for unknown units,
/// [`MarketError::AlreadyRedeemed`] for repeat redemptions, and
/// [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    post,
    path = "/api/v1/inventory/{item_id}/redeem",
    tag = "Inventory",
    summary = "Redeem a unit",
    description = "Marks a unit as redeemed. Redemption is one-way; the unit stays in the \
                   owner's inventory afterwards.",
    params(
        ("item_id" = uuid::Uuid, Path, description = "Unit UUID"),
    ),
    responses(
        (status = 200, description = "Redeemed unit", body = InventoryItemResponse),
        (status = 404, description = "Unit not found", body = ErrorResponse),
        (status = 409, description = "Unit already redeemed", body = ErrorResponse),
    )
)]
pub async fn redeem_item(
    State(state): State<AppState>,
    Path(item_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let item = state.store.redeem(item_id).await?;
    Ok(Json(InventoryItemResponse::from(item)))
}

/// Inventory routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}/inventory", get(list_inventory))
        .route("/inventory/{item_id}/showcase", patch(set_showcase))
        .route("/inventory/{item_id}/redeem", post(redeem_item))
}
