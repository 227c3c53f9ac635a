//! Persistence layer: store traits and their PostgreSQL and in-memory
//! implementations.
//!
//! Each marketplace resource (catalog, wallet, inventory, stock,
//! transactions, shipping, cart, missions) has one trait in [`store`];
//! [`PostgresStore`] is the production implementation over
//! `sqlx::PgPool`, and [`MemoryStore`] backs unit tests and local runs.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::MarketStore;
