use thiserror::Error;

/// Errors raised while building an [`OrderLines`](crate::OrderLines) set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderLinesError {
    /// A line requested a negative amount of a product.
    #[error("field 'amount' in product {product} should be more than 0")]
    NegativeAmount { product: String, amount: i64 },

    /// Summing duplicate lines overflowed the amount type.
    #[error("requested amount of product {product} is too large")]
    AmountOverflow { product: String },
}
