//! # jest-market
//!
//! Purchase orchestration service for the Jest dual-currency marketplace.
//!
//! Products are bought with Jest Coin, fiat money, or a hybrid split of
//! both. A purchase coordinates the wallet ledger, per-unit inventory
//! minting, stock counters, and a durable transaction log; failures after
//! the first mutation are compensated in reverse order so money and goods
//! never end up on the same side.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── PurchaseService / CartService / MissionService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── Store traits (persistence/store)
//!     │     ├── PostgresStore (production)
//!     │     └── MemoryStore (tests)
//!     │
//!     └── PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
