//! Fans a purchase out to the registered consumers and collects the reply.

use std::collections::HashMap;
use std::sync::Arc;

use common::{DispatchId, OrderLines};
use store::ProductStore;
use tokio::time::Instant;
use tracing::Instrument;

use crate::cancel::CancelToken;
use crate::consumer::{Consumer, OrderContext, Worker, WorkerKind};
use crate::error::{PurchaseError, Result};
use crate::rendezvous::OrderChannels;
use crate::task_group::TaskGroup;

/// Owns the consumer registry and runs one order at a time per call.
///
/// Each [`dispatch`](Self::dispatch) allocates its own channels and spawns
/// one task per registered consumer. The broadcast fan-out is derived from
/// the registry as it is when the call starts. The registry can only be
/// changed through `&mut self`, so it cannot change under an in-flight
/// order.
pub struct Dispatcher<S: ProductStore> {
    consumers: HashMap<String, Arc<Worker<S>>>,
}

impl<S: ProductStore + 'static> Dispatcher<S> {
    /// Creates a dispatcher with an empty registry.
    pub fn new() -> Self {
        Self {
            consumers: HashMap::new(),
        }
    }

    /// Adds a consumer, replacing any consumer with the same identity.
    pub fn register(&mut self, consumer: impl Into<Worker<S>>) {
        let worker = consumer.into();
        let identity = worker.identify().to_string();
        let kind = worker.kind();

        if self
            .consumers
            .insert(identity.clone(), Arc::new(worker))
            .is_some()
        {
            tracing::warn!(%identity, %kind, "consumer replaced");
        } else {
            tracing::info!(%identity, %kind, "consumer registered");
        }
    }

    /// Removes the consumer registered under `identity`.
    pub fn unregister(&mut self, identity: &str) -> bool {
        let removed = self.consumers.remove(identity).is_some();
        if removed {
            tracing::info!(%identity, "consumer unregistered");
        }
        removed
    }

    /// Returns the number of registered consumers.
    pub fn subscriber_count(&self) -> usize {
        self.consumers.len()
    }

    /// Processes an order and returns the encoded reply.
    pub async fn dispatch(&self, lines: OrderLines) -> Result<Vec<u8>> {
        self.dispatch_with(lines, &CancelToken::new()).await
    }

    /// Processes an order within the caller's cancellation scope.
    ///
    /// Cancelling `parent`, or passing its deadline, stops the order and
    /// surfaces as [`PurchaseError::Cancelled`] unless a consumer failed
    /// first.
    pub async fn dispatch_with(&self, lines: OrderLines, parent: &CancelToken) -> Result<Vec<u8>> {
        let dispatch_id = DispatchId::new();
        let budget_ms = parent
            .deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()).as_millis());
        let span = tracing::info_span!(
            "dispatch",
            %dispatch_id,
            lines = lines.len(),
            budget_ms = ?budget_ms
        );

        metrics::counter!("purchase_dispatches_total").increment(1);
        let started = std::time::Instant::now();

        let outcome = self
            .run(dispatch_id, Arc::new(lines), parent)
            .instrument(span.clone())
            .await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("purchase_dispatch_duration_seconds").record(duration);

        span.in_scope(|| match &outcome {
            Ok(reply) => tracing::info!(duration, bytes = reply.len(), "dispatch completed"),
            Err(err) => {
                metrics::counter!("purchase_dispatch_failures_total", "reason" => err.kind())
                    .increment(1);
                tracing::warn!(duration, error = %err, "dispatch failed");
            }
        });

        outcome
    }

    async fn run(
        &self,
        dispatch_id: DispatchId,
        lines: Arc<OrderLines>,
        parent: &CancelToken,
    ) -> Result<Vec<u8>> {
        if self.consumers.is_empty() {
            return Err(PurchaseError::NoSubscribers);
        }
        self.check_wiring()?;

        let receivers = self.consumers.len() - 1;
        let OrderChannels {
            broadcast,
            mut inboxes,
            reply_slot,
            reply_waiter,
        } = OrderChannels::allocate(receivers);
        let mut broadcast = Some(broadcast);
        let mut reply_slot = Some(reply_slot);

        let mut group = TaskGroup::new(parent.child());

        for (identity, consumer) in &self.consumers {
            let kind = consumer.kind();
            let mut ctx = OrderContext::new(dispatch_id, group.token().clone());

            if kind.produces_verdict() {
                if let Some(broadcast) = broadcast.take() {
                    ctx = ctx.with_broadcast(broadcast);
                }
            } else if let Some(inbox) = inboxes.pop() {
                ctx = ctx.with_inbox(inbox);
            }

            if kind.composes_reply()
                && let Some(slot) = reply_slot.take()
            {
                ctx = ctx.with_reply(slot);
            }

            let consumer = Arc::clone(consumer);
            let lines = Arc::clone(&lines);
            group.spawn(identity, async move { consumer.process(ctx, lines).await });
        }

        tracing::debug!(consumers = group.len(), receivers, "consumers spawned");

        let waited = reply_waiter.wait(group.token()).await;
        let joined = group.join_all().await;

        match (joined, waited) {
            (Err(err), _) => Err(err),
            (Ok(()), waited) => waited,
        }
    }

    /// Exactly one verdict producer and one reply composer make a pipeline.
    fn check_wiring(&self) -> Result<()> {
        let count = |kind: WorkerKind| {
            self.consumers
                .values()
                .filter(|consumer| consumer.kind() == kind)
                .count()
        };

        for kind in [WorkerKind::StockValidator, WorkerKind::ReplyComposer] {
            let found = count(kind);
            if found != 1 {
                return Err(PurchaseError::Wiring(format!(
                    "expected exactly one {kind}, found {found}"
                )));
            }
        }

        Ok(())
    }
}

impl<S: ProductStore + 'static> Default for Dispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}
