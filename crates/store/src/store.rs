use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{CheckId, Product, ProductId, Result};

/// Core trait for product storage implementations.
///
/// Every call either succeeds or reports a [`StoreError`](crate::StoreError).
/// Transactions spanning several calls are not part of this contract.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Looks a product up by its unique name.
    ///
    /// Fails with `NotFound` when no such product exists.
    async fn find_product_by_name(&self, name: &str) -> Result<Product>;

    /// Creates a new check and returns its id.
    async fn create_check(&self, is_confirmed: bool, date_at: DateTime<Utc>) -> Result<CheckId>;

    /// Records `req_amount` units of a product as part of a check.
    async fn insert_order_line(
        &self,
        check_id: CheckId,
        product_id: ProductId,
        req_amount: i64,
    ) -> Result<()>;
}

#[async_trait]
impl<T: ProductStore + ?Sized> ProductStore for std::sync::Arc<T> {
    async fn find_product_by_name(&self, name: &str) -> Result<Product> {
        (**self).find_product_by_name(name).await
    }

    async fn create_check(&self, is_confirmed: bool, date_at: DateTime<Utc>) -> Result<CheckId> {
        (**self).create_check(is_confirmed, date_at).await
    }

    async fn insert_order_line(
        &self,
        check_id: CheckId,
        product_id: ProductId,
        req_amount: i64,
    ) -> Result<()> {
        (**self)
            .insert_order_line(check_id, product_id, req_amount)
            .await
    }
}
