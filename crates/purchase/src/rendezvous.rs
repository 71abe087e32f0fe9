//! Per-order channels between the dispatcher and its consumers.
//!
//! Every dispatch allocates its own [`OrderChannels`], so a verdict or reply
//! can only ever reach the consumers of the order that produced it. The
//! verdict goes out through one single-use mailbox per receiver; publishing
//! never blocks, so a receiver that gave up on cancellation cannot leave the
//! producer stuck.

use tokio::sync::oneshot;

use crate::cancel::CancelToken;
use crate::error::{PurchaseError, Result};
use crate::reply::Verdict;

/// All channel ends of one order.
pub struct OrderChannels {
    pub broadcast: VerdictBroadcast,
    pub inboxes: Vec<VerdictInbox>,
    pub reply_slot: ReplySlot,
    pub reply_waiter: ReplyWaiter,
}

impl OrderChannels {
    /// Allocates fresh channels for `receivers` verdict receivers.
    pub fn allocate(receivers: usize) -> Self {
        let (mailboxes, inboxes): (Vec<_>, Vec<_>) = (0..receivers)
            .map(|_| {
                let (tx, rx) = oneshot::channel();
                (tx, VerdictInbox { rx })
            })
            .unzip();
        let (reply_tx, reply_rx) = oneshot::channel();

        Self {
            broadcast: VerdictBroadcast { mailboxes },
            inboxes,
            reply_slot: ReplySlot { tx: reply_tx },
            reply_waiter: ReplyWaiter { rx: reply_rx },
        }
    }
}

/// Producer side of the verdict broadcast.
#[derive(Debug)]
pub struct VerdictBroadcast {
    mailboxes: Vec<oneshot::Sender<Verdict>>,
}

impl VerdictBroadcast {
    /// Number of receivers this broadcast will reach.
    pub fn receivers(&self) -> usize {
        self.mailboxes.len()
    }

    /// Delivers a copy of `verdict` to every receiver still listening.
    ///
    /// Returns how many copies were delivered.
    pub fn publish(self, verdict: &Verdict) -> usize {
        let mut delivered = 0;
        for mailbox in self.mailboxes {
            if mailbox.send(verdict.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

/// Receiver side of the verdict broadcast. Consumed by one receive.
#[derive(Debug)]
pub struct VerdictInbox {
    rx: oneshot::Receiver<Verdict>,
}

impl VerdictInbox {
    /// Waits for the verdict or for cancellation, whichever comes first.
    pub async fn receive(self, cancel: &CancelToken) -> Result<Verdict> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PurchaseError::Cancelled),
            verdict = self.rx => verdict.map_err(|_| PurchaseError::VerdictUnavailable),
        }
    }
}

/// Sending side of the final reply.
#[derive(Debug)]
pub struct ReplySlot {
    tx: oneshot::Sender<Vec<u8>>,
}

impl ReplySlot {
    /// Hands the encoded reply to the dispatcher.
    pub fn send(self, reply: Vec<u8>) -> Result<()> {
        self.tx.send(reply).map_err(|_| PurchaseError::Cancelled)
    }
}

/// Dispatcher side of the final reply.
#[derive(Debug)]
pub struct ReplyWaiter {
    rx: oneshot::Receiver<Vec<u8>>,
}

impl ReplyWaiter {
    /// Waits for the reply; a reply already sent wins over cancellation.
    pub async fn wait(self, cancel: &CancelToken) -> Result<Vec<u8>> {
        tokio::select! {
            biased;
            reply = self.rx => reply.map_err(|_| PurchaseError::ReplyUnavailable),
            () = cancel.cancelled() => Err(PurchaseError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_inbox_gets_its_own_copy() {
        let channels = OrderChannels::allocate(2);
        let cancel = CancelToken::new();
        assert_eq!(channels.broadcast.receivers(), 2);

        let verdict = Verdict::from_problems(vec!["short".to_string()]);
        assert_eq!(channels.broadcast.publish(&verdict), 2);

        for inbox in channels.inboxes {
            assert_eq!(inbox.receive(&cancel).await.unwrap(), verdict);
        }
    }

    #[tokio::test]
    async fn test_publish_skips_receivers_that_left() {
        let mut channels = OrderChannels::allocate(2);
        drop(channels.inboxes.pop());

        let delivered = channels.broadcast.publish(&Verdict::default());
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_receive_observes_cancellation() {
        let channels = OrderChannels::allocate(1);
        let cancel = CancelToken::new();
        cancel.cancel();

        let inbox = channels.inboxes.into_iter().next().unwrap();
        let err = inbox.receive(&cancel).await.unwrap_err();
        assert!(matches!(err, PurchaseError::Cancelled));
        // The producer is not blocked by the departed receiver.
        assert_eq!(channels.broadcast.publish(&Verdict::default()), 0);
    }

    #[tokio::test]
    async fn test_dropped_producer_means_no_verdict() {
        let channels = OrderChannels::allocate(1);
        drop(channels.broadcast);

        let inbox = channels.inboxes.into_iter().next().unwrap();
        let err = inbox.receive(&CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, PurchaseError::VerdictUnavailable));
    }

    #[tokio::test]
    async fn test_reply_round_trip_and_missing_reply() {
        let channels = OrderChannels::allocate(0);
        channels.reply_slot.send(b"{}".to_vec()).unwrap();
        let reply = channels.reply_waiter.wait(&CancelToken::new()).await.unwrap();
        assert_eq!(reply, b"{}");

        let channels = OrderChannels::allocate(0);
        drop(channels.reply_slot);
        let err = channels
            .reply_waiter
            .wait(&CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PurchaseError::ReplyUnavailable));
    }
}
