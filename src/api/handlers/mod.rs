//! REST endpoint handlers organized by resource.

pub mod cart;
pub mod inventory;
pub mod product;
pub mod purchase;
pub mod system;
pub mod wallet;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(product::routes())
        .merge(purchase::routes())
        .merge(wallet::routes())
        .merge(inventory::routes())
        .merge(cart::routes())
}
