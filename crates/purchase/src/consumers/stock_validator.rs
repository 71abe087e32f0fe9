//! Decides whether an order can be served from current stock.

use std::sync::Arc;

use async_trait::async_trait;
use common::OrderLines;
use store::ProductStore;

use crate::cancel::CancelToken;
use crate::consumer::{Consumer, OrderContext};
use crate::error::Result;
use crate::reply::Verdict;

/// Checks every line against stock and broadcasts the [`Verdict`].
///
/// The verdict is fully computed before any copy goes out. When validation
/// fails, an empty unconfirmed verdict is still published so that no peer is
/// left waiting, and the failure is returned to the dispatcher.
pub struct StockValidator<S: ProductStore> {
    name: String,
    store: S,
}

impl<S: ProductStore> StockValidator<S> {
    pub fn new(name: impl Into<String>, store: S) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Builds the verdict for `lines`. Any lookup failure aborts the order,
    /// and so does cancellation, even while a lookup is in flight.
    pub async fn validate(&self, lines: &OrderLines, cancel: &CancelToken) -> Result<Verdict> {
        let mut problems = Vec::new();

        for (name, requested) in lines.iter() {
            let product = cancel
                .run_until_cancelled(self.store.find_product_by_name(name))
                .await??;
            if product.amount < requested {
                problems.push(Verdict::shortage(name, requested, product.amount));
            }
        }

        Ok(Verdict::from_problems(problems))
    }
}

#[async_trait]
impl<S: ProductStore> Consumer for StockValidator<S> {
    fn identify(&self) -> &str {
        &self.name
    }

    async fn process(&self, mut ctx: OrderContext, lines: Arc<OrderLines>) -> Result<()> {
        let broadcast = ctx.take_broadcast()?;

        match self.validate(&lines, ctx.cancel_token()).await {
            Ok(verdict) => {
                if !verdict.confirmed {
                    metrics::counter!("purchase_unconfirmed_orders_total").increment(1);
                }
                let delivered = broadcast.publish(&verdict);
                tracing::debug!(
                    dispatch_id = %ctx.dispatch_id(),
                    confirmed = verdict.confirmed,
                    problems = verdict.problems.len(),
                    delivered,
                    "verdict published"
                );
                Ok(())
            }
            Err(err) => {
                broadcast.publish(&Verdict::default());
                tracing::warn!(
                    dispatch_id = %ctx.dispatch_id(),
                    error = %err,
                    "stock validation failed"
                );
                Err(err)
            }
        }
    }
}
