//! Wallet endpoint handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::WalletResponse;
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::MarketError;
use crate::persistence::store::WalletLedger;

/// `GET /users/:user_id/wallet` — Wallet balance.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/wallet",
    tag = "Wallet",
    summary = "Get wallet balance",
    description = "Returns the user's Jest Coin balance and lifetime totals. A zero-balance \
                   wallet is created on first access.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Wallet owner UUID"),
    ),
    responses(
        (status = 200, description = "Wallet state", body = WalletResponse),
    )
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let wallet = state
        .store
        .get_or_create_wallet(UserId::from_uuid(user_id))
        .await?;
    Ok(Json(WalletResponse::from(wallet)))
}

/// Wallet routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{user_id}/wallet", get(get_wallet))
}
