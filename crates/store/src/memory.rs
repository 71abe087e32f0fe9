use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    Check, CheckId, OrderLineRecord, Product, ProductId, Result, StoreError, store::ProductStore,
};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<String, Product>,
    checks: Vec<Check>,
    order_lines: Vec<OrderLineRecord>,
    next_product_id: i64,
}

#[derive(Debug, Default)]
struct Faults {
    failing_lookups: HashSet<String>,
    fail_on_create_check: bool,
    fail_on_insert_line: bool,
}

/// In-memory product store for tests and demo mode.
///
/// This implementation keeps every table in memory and provides the same
/// interface as the PostgreSQL implementation. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<RwLock<Faults>>,
}

impl InMemoryProductStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `(name, cost, amount)` products.
    pub async fn with_products<'a>(products: impl IntoIterator<Item = (&'a str, i64, i64)>) -> Self {
        let store = Self::new();
        for (name, cost, amount) in products {
            store.insert_product(name, cost, amount).await;
        }
        store
    }

    /// Inserts or replaces a product and returns its id.
    pub async fn insert_product(&self, name: &str, cost: i64, amount: i64) -> ProductId {
        let mut tables = self.tables.write().await;
        let id = match tables.products.get(name) {
            Some(existing) => existing.id,
            None => {
                tables.next_product_id += 1;
                ProductId::new(tables.next_product_id)
            }
        };
        tables.products.insert(
            name.to_string(),
            Product {
                id,
                name: name.to_string(),
                cost,
                amount,
            },
        );
        id
    }

    /// Makes every lookup of `name` fail with a backend error.
    pub async fn fail_lookup_of(&self, name: &str) {
        self.faults
            .write()
            .await
            .failing_lookups
            .insert(name.to_string());
    }

    /// Configures whether creating a check fails.
    pub async fn set_fail_on_create_check(&self, fail: bool) {
        self.faults.write().await.fail_on_create_check = fail;
    }

    /// Configures whether inserting an order line fails.
    pub async fn set_fail_on_insert_line(&self, fail: bool) {
        self.faults.write().await.fail_on_insert_line = fail;
    }

    /// Returns all stored checks in creation order.
    pub async fn checks(&self) -> Vec<Check> {
        self.tables.read().await.checks.clone()
    }

    /// Returns all stored order lines in insertion order.
    pub async fn order_lines(&self) -> Vec<OrderLineRecord> {
        self.tables.read().await.order_lines.clone()
    }

    pub async fn check_count(&self) -> usize {
        self.tables.read().await.checks.len()
    }

    pub async fn order_line_count(&self) -> usize {
        self.tables.read().await.order_lines.len()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_product_by_name(&self, name: &str) -> Result<Product> {
        if self.faults.read().await.failing_lookups.contains(name) {
            return Err(StoreError::Unavailable(format!(
                "lookup of product {name} failed"
            )));
        }

        self.tables
            .read()
            .await
            .products
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn create_check(&self, is_confirmed: bool, date_at: DateTime<Utc>) -> Result<CheckId> {
        if self.faults.read().await.fail_on_create_check {
            return Err(StoreError::Unavailable("insert into check failed".to_string()));
        }

        let mut tables = self.tables.write().await;
        let id = CheckId::new(tables.checks.len() as i64 + 1);
        tables.checks.push(Check {
            id,
            is_confirmed,
            date_at,
        });
        Ok(id)
    }

    async fn insert_order_line(
        &self,
        check_id: CheckId,
        product_id: ProductId,
        req_amount: i64,
    ) -> Result<()> {
        if self.faults.read().await.fail_on_insert_line {
            return Err(StoreError::Unavailable("insert into order failed".to_string()));
        }

        let mut tables = self.tables.write().await;
        let id = tables.order_lines.len() as i64 + 1;
        tables.order_lines.push(OrderLineRecord {
            id,
            check_id,
            product_id,
            req_amount,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_seeded_product() {
        let store = InMemoryProductStore::with_products([("apple", 200, 50)]).await;

        let product = store.find_product_by_name("apple").await.unwrap();
        assert_eq!(product.name, "apple");
        assert_eq!(product.cost, 200);
        assert_eq!(product.amount, 50);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let store = InMemoryProductStore::new();

        let err = store.find_product_by_name("durian").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "product with name durian doesn't exist");
    }

    #[tokio::test]
    async fn test_reinserting_product_keeps_id() {
        let store = InMemoryProductStore::new();
        let first = store.insert_product("apple", 200, 50).await;
        let second = store.insert_product("apple", 250, 10).await;
        let other = store.insert_product("melon", 200, 10).await;

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(store.find_product_by_name("apple").await.unwrap().cost, 250);
    }

    #[tokio::test]
    async fn test_check_and_order_lines() {
        let store = InMemoryProductStore::with_products([("apple", 200, 50)]).await;
        let product = store.find_product_by_name("apple").await.unwrap();

        let check_id = store.create_check(true, Utc::now()).await.unwrap();
        store
            .insert_order_line(check_id, product.id, 10)
            .await
            .unwrap();

        let checks = store.checks().await;
        assert_eq!(checks.len(), 1);
        assert!(checks[0].is_confirmed);

        let lines = store.order_lines().await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].check_id, check_id);
        assert_eq!(lines[0].product_id, product.id);
        assert_eq!(lines[0].req_amount, 10);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryProductStore::with_products([("apple", 200, 50)]).await;
        store.fail_lookup_of("apple").await;
        store.set_fail_on_create_check(true).await;

        let lookup = store.find_product_by_name("apple").await.unwrap_err();
        assert!(matches!(lookup, StoreError::Unavailable(_)));
        assert!(store.create_check(true, Utc::now()).await.is_err());
        assert_eq!(store.check_count().await, 0);
    }
}
