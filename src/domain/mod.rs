//! Domain layer: identifiers, payment math, token minting, and events.
//!
//! This module contains the server-side domain model shared by the
//! service and persistence layers: typed user/product identifiers, the
//! dual-currency payment method and its split math, inventory token
//! generation, purchase request types, and the event bus broadcasting
//! state changes to the rest of the site.

pub mod event_bus;
pub mod ids;
pub mod market_event;
pub mod payment;
pub mod purchase;
pub mod token;

pub use event_bus::EventBus;
pub use ids::{ProductId, UserId};
pub use market_event::MarketEvent;
pub use payment::{PaymentMethod, PriceTag};
pub use purchase::{DenyReason, PurchaseCheck, PurchaseRequest, ShippingAddress};
