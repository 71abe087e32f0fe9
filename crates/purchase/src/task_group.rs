//! Structured concurrency for the consumers of one dispatch.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;
use tracing::Instrument;

use crate::cancel::CancelToken;
use crate::error::{PurchaseError, Result};

type FailureSlot = Arc<Mutex<Option<PurchaseError>>>;

/// A group of tasks sharing one cancellation scope.
///
/// The first task to fail has its error recorded and cancels the scope for
/// the rest. [`join_all`](Self::join_all) consumes the group, so every child
/// is joined before the first failure is handed back. Dropping the group
/// without joining aborts the children.
pub struct TaskGroup {
    tasks: JoinSet<()>,
    token: CancelToken,
    first_failure: FailureSlot,
}

impl TaskGroup {
    /// Creates an empty group driven by `token`.
    pub fn new(token: CancelToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            token,
            first_failure: Arc::new(Mutex::new(None)),
        }
    }

    /// The scope shared by every task of this group.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Number of tasks not yet joined.
    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Spawns a task; a failure is recorded and cancels the group.
    pub fn spawn<F>(&mut self, name: &str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let token = self.token.clone();
        let slot = Arc::clone(&self.first_failure);
        let span = tracing::debug_span!("task", name);

        self.tasks.spawn(
            async move {
                if let Err(err) = task.await {
                    tracing::debug!(error = %err, "task failed");
                    record_failure(&slot, err);
                    token.cancel();
                }
            }
            .instrument(span),
        );
    }

    /// Joins every task and returns the first recorded failure, if any.
    pub async fn join_all(mut self) -> Result<()> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(join_err) = joined {
                tracing::error!(error = %join_err, "task did not complete");
                record_failure(
                    &self.first_failure,
                    PurchaseError::TaskPanicked(join_err.to_string()),
                );
                self.token.cancel();
            }
        }

        let failure = self
            .first_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn record_failure(slot: &FailureSlot, err: PurchaseError) {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_none() {
        *slot = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_all_tasks_succeed() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut group = TaskGroup::new(CancelToken::new());

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            group.spawn("counter", async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        assert_eq!(group.len(), 3);
        group.join_all().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_failure_cancels_siblings_and_wins() {
        let mut group = TaskGroup::new(CancelToken::new());

        let token = group.token().clone();
        group.spawn("waiter", async move {
            token.cancelled().await;
            Err(PurchaseError::Cancelled)
        });
        group.spawn("failing", async { Err(PurchaseError::VerdictUnavailable) });

        let err = group.join_all().await.unwrap_err();
        assert!(matches!(err, PurchaseError::VerdictUnavailable));
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let mut group = TaskGroup::new(CancelToken::new());
        group.spawn("panics", async {
            if true {
                panic!("boom");
            }
            Ok(())
        });

        let err = group.join_all().await.unwrap_err();
        assert!(matches!(err, PurchaseError::TaskPanicked(_)));
    }

    #[tokio::test]
    async fn test_failure_does_not_cancel_parent_scope() {
        let parent = CancelToken::new();
        let mut group = TaskGroup::new(parent.child());
        group.spawn("failing", async { Err(PurchaseError::ReplyUnavailable) });

        assert!(group.join_all().await.is_err());
        assert!(!parent.is_cancelled());
    }
}
