use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{CheckId, Product, ProductId, Result, StoreError, store::ProductStore};

const SELECT_PRODUCT_BY_NAME: &str = "SELECT id, name, cost, amount FROM product WHERE name = $1";

const INSERT_CHECK: &str = r#"
    INSERT INTO "check" (is_confirmed, date)
    VALUES ($1, $2)
    RETURNING id
"#;

const INSERT_ORDER_LINE: &str = r#"
    INSERT INTO "order" (product_id, check_id, req_amount)
    VALUES ($1, $2, $3)
"#;

/// PostgreSQL-backed product store.
#[derive(Clone)]
pub struct PostgresProductStore {
    pool: PgPool,
}

impl PostgresProductStore {
    /// Creates a new store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and verifies the connection.
    #[tracing::instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        tracing::info!("connecting to postgresql");
        let pool = PgPool::connect(database_url).await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        tracing::info!("connection to postgresql is stable");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            cost: row.try_get("cost")?,
            amount: row.try_get("amount")?,
        })
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    #[tracing::instrument(skip(self))]
    async fn find_product_by_name(&self, name: &str) -> Result<Product> {
        tracing::trace!(query = SELECT_PRODUCT_BY_NAME, "sql query");

        let row = sqlx::query(SELECT_PRODUCT_BY_NAME)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(product = name, error = %e, "product lookup failed");
                StoreError::Database(e)
            })?;

        match row {
            Some(row) => Self::row_to_product(row),
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn create_check(&self, is_confirmed: bool, date_at: DateTime<Utc>) -> Result<CheckId> {
        tracing::trace!(query = INSERT_CHECK, "sql query");

        let id: i64 = sqlx::query_scalar(INSERT_CHECK)
            .bind(is_confirmed)
            .bind(date_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "insert check failed");
                StoreError::Database(e)
            })?;

        Ok(CheckId::new(id))
    }

    #[tracing::instrument(skip(self))]
    async fn insert_order_line(
        &self,
        check_id: CheckId,
        product_id: ProductId,
        req_amount: i64,
    ) -> Result<()> {
        tracing::trace!(query = INSERT_ORDER_LINE, "sql query");

        sqlx::query(INSERT_ORDER_LINE)
            .bind(product_id.as_i64())
            .bind(check_id.as_i64())
            .bind(req_amount)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "insert order line failed");
                StoreError::Database(e)
            })?;

        Ok(())
    }
}
