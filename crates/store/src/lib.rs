//! Storage port consumed by the purchase workers.
//!
//! The purchase core only needs three capabilities from storage: look a
//! product up by name, open a check, and attach order lines to it. They are
//! expressed by [`ProductStore`] and backed either by memory (tests, demo
//! mode) or by PostgreSQL.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{CheckId, ProductId};
pub use error::{Result, StoreError};
pub use memory::InMemoryProductStore;
pub use model::{Check, OrderLineRecord, Product};
pub use postgres::PostgresProductStore;
pub use store::ProductStore;
