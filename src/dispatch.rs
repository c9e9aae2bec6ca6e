//! Per-message dispatch unit.
//!
//! Bundles one decoded message with the processor that should receive it.
//! Created by the read loop for every inbound message and consumed by
//! delivery; never retained.

use std::sync::Arc;

use tracing::trace;

use crate::processor::Processor;

pub(crate) struct Dispatch<T> {
    msg: T,
    processor: Arc<dyn Processor<T>>,
}

impl<T: Send + 'static> Dispatch<T> {
    pub(crate) fn new(msg: T, processor: Arc<dyn Processor<T>>) -> Self {
        Self { msg, processor }
    }

    /// Deliver inline; the caller (the read loop) resumes only after the
    /// processor has finished with the message.
    pub(crate) async fn deliver(self) {
        self.processor.input(self.msg).await;
    }

    /// Deliver on a new task. Fire-and-forget: no result or error flows
    /// back to the read loop, and nothing bounds how many of these can be
    /// in flight at once.
    pub(crate) fn spawn(self) {
        trace!("spawning concurrent dispatch worker");
        tokio::spawn(self.deliver());
    }
}
