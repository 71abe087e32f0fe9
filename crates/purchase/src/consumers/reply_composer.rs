//! Prices the order and hands the customer reply to the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use common::OrderLines;
use store::ProductStore;

use crate::cancel::CancelToken;
use crate::consumer::{Consumer, OrderContext};
use crate::error::Result;
use crate::reply::{FinalReply, Verdict};

/// Prices every line, whether or not the order was confirmed, and sends the
/// encoded [`FinalReply`] exactly once.
pub struct ReplyComposer<S: ProductStore> {
    name: String,
    store: S,
}

impl<S: ProductStore> ReplyComposer<S> {
    pub fn new(name: impl Into<String>, store: S) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Builds the reply for `lines` on top of `verdict`, giving up as soon
    /// as `cancel` fires.
    pub async fn compose(
        &self,
        lines: &OrderLines,
        verdict: Verdict,
        cancel: &CancelToken,
    ) -> Result<FinalReply> {
        let mut reply = FinalReply::from_verdict(verdict);

        for (name, requested) in lines.iter() {
            let product = cancel
                .run_until_cancelled(self.store.find_product_by_name(name))
                .await??;
            reply.add_position(&product, requested)?;
        }

        Ok(reply)
    }
}

#[async_trait]
impl<S: ProductStore> Consumer for ReplyComposer<S> {
    fn identify(&self) -> &str {
        &self.name
    }

    async fn process(&self, mut ctx: OrderContext, lines: Arc<OrderLines>) -> Result<()> {
        let slot = ctx.take_reply()?;
        let verdict = ctx.take_inbox()?.receive(ctx.cancel_token()).await?;

        let reply = self.compose(&lines, verdict, ctx.cancel_token()).await?;
        let bytes = reply.to_bytes()?;
        tracing::debug!(
            dispatch_id = %ctx.dispatch_id(),
            total_cost = reply.total_cost,
            bytes = bytes.len(),
            "reply composed"
        );

        slot.send(bytes)
    }
}
