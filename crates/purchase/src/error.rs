//! Purchase error types.

use store::StoreError;
use thiserror::Error;

/// Errors that can occur while processing a purchase.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// Dispatch was attempted with an empty registry.
    #[error("subject doesn't have any subscribers")]
    NoSubscribers,

    /// The registered consumers cannot form a complete pipeline.
    #[error("invalid consumer wiring: {0}")]
    Wiring(String),

    /// Storage error, surfaced verbatim.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The order's scope was cancelled or its deadline passed.
    #[error("order processing was cancelled")]
    Cancelled,

    /// The stock validator went away without publishing a verdict.
    #[error("stock verdict was never published")]
    VerdictUnavailable,

    /// The reply composer went away without sending a reply.
    #[error("reply was never sent")]
    ReplyUnavailable,

    /// A line cost or the order total does not fit the cost type.
    #[error("cost of product {product} is too large")]
    CostOverflow { product: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A consumer task panicked or was aborted.
    #[error("consumer task failed: {0}")]
    TaskPanicked(String),
}

impl PurchaseError {
    /// Short, stable label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PurchaseError::NoSubscribers => "no_subscribers",
            PurchaseError::Wiring(_) => "wiring",
            PurchaseError::Store(StoreError::NotFound(_)) => "not_found",
            PurchaseError::Store(_) => "store",
            PurchaseError::Cancelled => "cancelled",
            PurchaseError::VerdictUnavailable => "verdict_unavailable",
            PurchaseError::ReplyUnavailable => "reply_unavailable",
            PurchaseError::CostOverflow { .. } => "cost_overflow",
            PurchaseError::Serialization(_) => "serialization",
            PurchaseError::TaskPanicked(_) => "task_panicked",
        }
    }
}

/// Convenience type alias for purchase results.
pub type Result<T> = std::result::Result<T, PurchaseError>;
