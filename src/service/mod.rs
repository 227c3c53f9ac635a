//! Business logic: purchase orchestration, cart management, missions,
//! and the fiat payment gateway seam.

pub mod cart_service;
pub mod mission_service;
pub mod payment_gateway;
pub mod purchase_service;

pub use cart_service::{CartService, CartTotals};
pub use mission_service::{FIRST_PURCHASE_MISSION, MissionService};
pub use payment_gateway::{NoopGateway, PaymentGateway};
pub use purchase_service::{CartPurchaseOutcome, PurchaseService};
