//! Rows owned by the storage collaborator.

use chrono::{DateTime, Utc};
use common::{CheckId, ProductId};

/// A sellable product with its unit cost and current stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit cost.
    pub cost: i64,
    /// Units in stock.
    pub amount: i64,
}

/// A purchase check. Only confirmed orders produce one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub id: CheckId,
    pub is_confirmed: bool,
    pub date_at: DateTime<Utc>,
}

/// Link between a check and one purchased product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRecord {
    pub id: i64,
    pub check_id: CheckId,
    pub product_id: ProductId,
    pub req_amount: i64,
}
