//! Cancellation scopes shared by the tasks of one dispatch.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{PurchaseError, Result};

/// A cloneable cancellation scope.
///
/// Clones observe the same scope. A [`child`](Self::child) scope is
/// cancelled when its parent is, but cancelling the child leaves the parent
/// untouched. An optional deadline turns into a cancellation once it passes
/// and is inherited by children.
#[derive(Debug, Clone)]
pub struct CancelToken {
    own: Arc<watch::Sender<bool>>,
    /// Own receiver followed by every ancestor's receiver.
    watched: Vec<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled root scope.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            own: Arc::new(tx),
            watched: vec![rx],
            deadline: None,
        }
    }

    /// Returns this scope with a deadline; the earliest deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Creates a child scope of this one.
    pub fn child(&self) -> Self {
        let (tx, rx) = watch::channel(false);
        let mut watched = Vec::with_capacity(self.watched.len() + 1);
        watched.push(rx);
        watched.extend(self.watched.iter().cloned());
        Self {
            own: Arc::new(tx),
            watched,
            deadline: self.deadline,
        }
    }

    /// Cancels this scope and all of its children.
    pub fn cancel(&self) {
        self.own.send_replace(true);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once this scope, an ancestor, or the deadline fired.
    pub fn is_cancelled(&self) -> bool {
        self.watched.iter().any(|rx| *rx.borrow())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Completes once the scope is cancelled.
    pub async fn cancelled(&self) {
        let mut waits: Vec<BoxFuture<'static, ()>> = self
            .watched
            .iter()
            .cloned()
            .map(|mut rx| {
                async move {
                    // A dropped sender can never cancel.
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        future::pending::<()>().await;
                    }
                }
                .boxed()
            })
            .collect();

        if let Some(deadline) = self.deadline {
            waits.push(tokio::time::sleep_until(deadline).boxed());
        }

        future::select_all(waits).await;
    }

    /// Drives `work` to completion unless the scope is cancelled first, in
    /// which case `work` is dropped.
    pub async fn run_until_cancelled<F: Future>(&self, work: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            () = self.cancelled() => Err(PurchaseError::Cancelled),
            output = work => Ok(output),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
