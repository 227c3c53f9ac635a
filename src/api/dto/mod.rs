//! Data Transfer Objects for REST request/response serialization.
//!
//! Fiat amounts are serialized as JSON strings to keep the two-decimal
//! representation exact on the wire.

pub mod cart_dto;
pub mod inventory_dto;
pub mod product_dto;
pub mod purchase_dto;
pub mod wallet_dto;

pub use cart_dto::*;
pub use inventory_dto::*;
pub use product_dto::*;
pub use purchase_dto::*;
pub use wallet_dto::*;
