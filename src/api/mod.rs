//! HTTP layer: DTOs, handlers, and router assembly.
//!
//! Resource routes are versioned under `/api/v1`; system routes
//! (health, payment-method catalog) sit at the root.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Assembles the full application router.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
