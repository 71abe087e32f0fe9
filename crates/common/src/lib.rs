//! Shared value types used across the purchase service crates.

pub mod error;
pub mod order_lines;
pub mod types;

pub use error::OrderLinesError;
pub use order_lines::OrderLines;
pub use types::{CheckId, DispatchId, ProductId};
