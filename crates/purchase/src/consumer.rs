//! The consumer capability and the closed set of purchase workers.

use std::sync::Arc;

use async_trait::async_trait;
use common::{DispatchId, OrderLines};
use store::ProductStore;

use crate::cancel::CancelToken;
use crate::consumers::{CheckPersister, ReplyComposer, StockValidator};
use crate::error::{PurchaseError, Result};
use crate::rendezvous::{ReplySlot, VerdictBroadcast, VerdictInbox};

/// A unit of order-processing logic run once per dispatched order.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Unique registry key of this consumer.
    fn identify(&self) -> &str;

    /// Processes one order using the channel ends handed over in `ctx`.
    async fn process(&self, ctx: OrderContext, lines: Arc<OrderLines>) -> Result<()>;
}

/// Per-task view of one dispatch: its id, its scope, and exactly the
/// channel ends the receiving consumer is entitled to.
#[derive(Debug)]
pub struct OrderContext {
    dispatch_id: DispatchId,
    cancel: CancelToken,
    broadcast: Option<VerdictBroadcast>,
    inbox: Option<VerdictInbox>,
    reply: Option<ReplySlot>,
}

impl OrderContext {
    pub fn new(dispatch_id: DispatchId, cancel: CancelToken) -> Self {
        Self {
            dispatch_id,
            cancel,
            broadcast: None,
            inbox: None,
            reply: None,
        }
    }

    pub fn with_broadcast(mut self, broadcast: VerdictBroadcast) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    pub fn with_inbox(mut self, inbox: VerdictInbox) -> Self {
        self.inbox = Some(inbox);
        self
    }

    pub fn with_reply(mut self, reply: ReplySlot) -> Self {
        self.reply = Some(reply);
        self
    }

    pub fn dispatch_id(&self) -> DispatchId {
        self.dispatch_id
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub(crate) fn take_broadcast(&mut self) -> Result<VerdictBroadcast> {
        self.broadcast
            .take()
            .ok_or_else(|| PurchaseError::Wiring("no verdict broadcast handed over".to_string()))
    }

    pub(crate) fn take_inbox(&mut self) -> Result<VerdictInbox> {
        self.inbox
            .take()
            .ok_or_else(|| PurchaseError::Wiring("no verdict inbox handed over".to_string()))
    }

    pub(crate) fn take_reply(&mut self) -> Result<ReplySlot> {
        self.reply
            .take()
            .ok_or_else(|| PurchaseError::Wiring("no reply slot handed over".to_string()))
    }
}

/// The role a worker plays in the order pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    StockValidator,
    CheckPersister,
    ReplyComposer,
}

impl WorkerKind {
    /// Whether the worker publishes the verdict rather than receiving it.
    pub fn produces_verdict(self) -> bool {
        matches!(self, WorkerKind::StockValidator)
    }

    /// Whether the worker sends the final reply.
    pub fn composes_reply(self) -> bool {
        matches!(self, WorkerKind::ReplyComposer)
    }
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerKind::StockValidator => write!(f, "StockValidator"),
            WorkerKind::CheckPersister => write!(f, "CheckPersister"),
            WorkerKind::ReplyComposer => write!(f, "ReplyComposer"),
        }
    }
}

/// Every consumer the dispatcher knows how to wire.
pub enum Worker<S: ProductStore> {
    StockValidator(StockValidator<S>),
    CheckPersister(CheckPersister<S>),
    ReplyComposer(ReplyComposer<S>),
}

impl<S: ProductStore> Worker<S> {
    pub fn kind(&self) -> WorkerKind {
        match self {
            Worker::StockValidator(_) => WorkerKind::StockValidator,
            Worker::CheckPersister(_) => WorkerKind::CheckPersister,
            Worker::ReplyComposer(_) => WorkerKind::ReplyComposer,
        }
    }
}

#[async_trait]
impl<S: ProductStore> Consumer for Worker<S> {
    fn identify(&self) -> &str {
        match self {
            Worker::StockValidator(w) => w.identify(),
            Worker::CheckPersister(w) => w.identify(),
            Worker::ReplyComposer(w) => w.identify(),
        }
    }

    async fn process(&self, ctx: OrderContext, lines: Arc<OrderLines>) -> Result<()> {
        match self {
            Worker::StockValidator(w) => w.process(ctx, lines).await,
            Worker::CheckPersister(w) => w.process(ctx, lines).await,
            Worker::ReplyComposer(w) => w.process(ctx, lines).await,
        }
    }
}

impl<S: ProductStore> From<StockValidator<S>> for Worker<S> {
    fn from(worker: StockValidator<S>) -> Self {
        Worker::StockValidator(worker)
    }
}

impl<S: ProductStore> From<CheckPersister<S>> for Worker<S> {
    fn from(worker: CheckPersister<S>) -> Self {
        Worker::CheckPersister(worker)
    }
}

impl<S: ProductStore> From<ReplyComposer<S>> for Worker<S> {
    fn from(worker: ReplyComposer<S>) -> Self {
        Worker::ReplyComposer(worker)
    }
}
