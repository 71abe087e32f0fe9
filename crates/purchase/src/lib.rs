//! Concurrent purchase processing.
//!
//! A [`Dispatcher`] fans each order out to a fixed set of consumers that run
//! as independent tasks and talk only through per-order channels:
//! 1. [`StockValidator`] checks stock and broadcasts a [`Verdict`]
//! 2. [`CheckPersister`] records a check when the verdict is confirmed
//! 3. [`ReplyComposer`] prices the order and sends the [`FinalReply`]
//!
//! The first consumer to fail cancels the others; the dispatcher joins every
//! task before reporting that failure.

pub mod cancel;
pub mod consumer;
pub mod consumers;
pub mod dispatcher;
pub mod error;
pub mod rendezvous;
pub mod reply;
pub mod task_group;

pub use cancel::CancelToken;
pub use consumer::{Consumer, OrderContext, Worker, WorkerKind};
pub use consumers::{CheckPersister, ReplyComposer, StockValidator};
pub use dispatcher::Dispatcher;
pub use error::{PurchaseError, Result};
pub use reply::{FinalReply, PricedLine, Verdict};
pub use task_group::TaskGroup;
