//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::persistence::PostgresStore;
use crate::service::{CartService, PurchaseService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Purchase orchestration over the shared store.
    pub purchase_service: Arc<PurchaseService<PostgresStore>>,
    /// Cart management over the shared store.
    pub cart_service: Arc<CartService<PostgresStore>>,
    /// Direct store access for plain reads (wallet, inventory, catalog).
    pub store: Arc<PostgresStore>,
    /// Event bus for purchase lifecycle events.
    pub event_bus: EventBus,
}
