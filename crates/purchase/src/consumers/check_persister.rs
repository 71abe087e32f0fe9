//! Records a purchase check for confirmed orders.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CheckId, OrderLines};
use store::ProductStore;

use crate::cancel::CancelToken;
use crate::consumer::{Consumer, OrderContext};
use crate::error::Result;

/// Persists a check and its order lines once the verdict is confirmed.
///
/// An unconfirmed verdict is a no-op. Every product is resolved before the
/// check is opened, so a failed lookup leaves nothing behind. An insert
/// failure stops the remaining inserts and is returned as is; rows already
/// written stay written.
pub struct CheckPersister<S: ProductStore> {
    name: String,
    store: S,
}

impl<S: ProductStore> CheckPersister<S> {
    pub fn new(name: impl Into<String>, store: S) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Creates the check and one order line per product.
    pub async fn persist(&self, lines: &OrderLines, cancel: &CancelToken) -> Result<CheckId> {
        let mut resolved = Vec::with_capacity(lines.len());
        for (name, requested) in lines.iter() {
            let product = cancel
                .run_until_cancelled(self.store.find_product_by_name(name))
                .await??;
            resolved.push((product.id, requested));
        }

        let check_id = cancel
            .run_until_cancelled(self.store.create_check(true, Utc::now()))
            .await??;

        for (product_id, requested) in resolved {
            let insert = self.store.insert_order_line(check_id, product_id, requested);
            cancel.run_until_cancelled(insert).await??;
        }

        Ok(check_id)
    }
}

#[async_trait]
impl<S: ProductStore> Consumer for CheckPersister<S> {
    fn identify(&self) -> &str {
        &self.name
    }

    async fn process(&self, mut ctx: OrderContext, lines: Arc<OrderLines>) -> Result<()> {
        let verdict = ctx.take_inbox()?.receive(ctx.cancel_token()).await?;

        let dispatch_id = ctx.dispatch_id();

        if !verdict.confirmed {
            tracing::debug!(%dispatch_id, "order not confirmed, no check created");
            return Ok(());
        }

        let check_id = self.persist(&lines, ctx.cancel_token()).await?;
        metrics::counter!("purchase_checks_created_total").increment(1);
        tracing::info!(%dispatch_id, %check_id, lines = lines.len(), "check created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::DispatchId;
    use store::InMemoryProductStore;

    use super::*;
    use crate::error::PurchaseError;
    use crate::rendezvous::OrderChannels;
    use crate::reply::Verdict;

    async fn run_with_verdict(
        store: &InMemoryProductStore,
        lines: OrderLines,
        verdict: Verdict,
    ) -> Result<()> {
        let persister = CheckPersister::new("persister", store.clone());
        let channels = OrderChannels::allocate(1);
        channels.broadcast.publish(&verdict);

        let inbox = channels.inboxes.into_iter().next().unwrap();
        let ctx = OrderContext::new(DispatchId::new(), CancelToken::new()).with_inbox(inbox);
        persister.process(ctx, Arc::new(lines)).await
    }

    #[tokio::test]
    async fn test_confirmed_order_creates_check_and_lines() {
        let store =
            InMemoryProductStore::with_products([("apple", 200, 50), ("melon", 200, 10)]).await;
        let lines = OrderLines::from_pairs([("apple", 10), ("melon", 1)]).unwrap();

        run_with_verdict(&store, lines, Verdict::from_problems(vec![]))
            .await
            .unwrap();

        let checks = store.checks().await;
        assert_eq!(checks.len(), 1);
        assert!(checks[0].is_confirmed);

        let recorded = store.order_lines().await;
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|line| line.check_id == checks[0].id));
        assert_eq!(recorded[0].req_amount, 10);
        assert_eq!(recorded[1].req_amount, 1);
    }

    #[tokio::test]
    async fn test_unconfirmed_order_is_noop() {
        let store = InMemoryProductStore::with_products([("apple", 200, 50)]).await;
        let lines = OrderLines::from_pairs([("apple", 200)]).unwrap();

        run_with_verdict(&store, lines, Verdict::from_problems(vec!["short".into()]))
            .await
            .unwrap();

        assert_eq!(store.check_count().await, 0);
        assert_eq!(store.order_line_count().await, 0);
    }

    #[tokio::test]
    async fn test_insert_failure_stops_remaining_lines() {
        let store =
            InMemoryProductStore::with_products([("apple", 200, 50), ("melon", 200, 10)]).await;
        store.set_fail_on_insert_line(true).await;
        let lines = OrderLines::from_pairs([("apple", 1), ("melon", 1)]).unwrap();

        let err = run_with_verdict(&store, lines, Verdict::from_problems(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, PurchaseError::Store(_)));
        assert_eq!(store.order_line_count().await, 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_creates_no_check() {
        let store =
            InMemoryProductStore::with_products([("apple", 200, 50), ("melon", 200, 10)]).await;
        let persister = CheckPersister::new("persister", store.clone());
        let lines = OrderLines::from_pairs([("apple", 1), ("melon", 1)]).unwrap();

        // Stock was fine when the verdict was made; melon vanishes afterwards.
        store.fail_lookup_of("melon").await;

        let err = persister
            .persist(&lines, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PurchaseError::Store(_)));
        assert_eq!(store.check_count().await, 0);
        assert_eq!(store.order_line_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancelled_scope_creates_no_check() {
        let store = InMemoryProductStore::with_products([("apple", 200, 50)]).await;
        let persister = CheckPersister::new("persister", store.clone());
        let lines = OrderLines::from_pairs([("apple", 1)]).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = persister.persist(&lines, &cancel).await.unwrap_err();
        assert!(matches!(err, PurchaseError::Cancelled));
        assert_eq!(store.check_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancellation_while_waiting_for_verdict() {
        let store = InMemoryProductStore::new();
        let persister = CheckPersister::new("persister", store.clone());
        let channels = OrderChannels::allocate(1);
        let cancel = CancelToken::new();
        cancel.cancel();

        let inbox = channels.inboxes.into_iter().next().unwrap();
        let ctx = OrderContext::new(DispatchId::new(), cancel).with_inbox(inbox);

        let err = persister
            .process(ctx, Arc::new(OrderLines::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, PurchaseError::Cancelled));
        assert_eq!(store.check_count().await, 0);
    }
}
