//! Handler lifecycle state machine.
//!
//! One `watch` channel per handler replaces the monitor the design calls
//! for: transitions are published under the channel's internal lock, and
//! every wait is a level-triggered `wait_for` that re-checks the state on
//! wakeup. Waits also complete on [`State::Closed`], so a handler closed
//! before attachment never strands its run loop.

use tokio::sync::watch;

/// Lifecycle state of a handler.
///
/// States are ordered: each transition only moves forward, and `Closed`
/// is terminal and reachable from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    /// Constructed, no transport bound yet.
    Created,
    /// Transport bound and the handler registered with its processor.
    Attached,
    /// Stream setup finished; reads and writes may proceed.
    Initialized,
    /// Torn down. Terminal.
    Closed,
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    tx: watch::Sender<State>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(State::Created);
        Self { tx }
    }

    pub(crate) fn state(&self) -> State {
        *self.tx.borrow()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state() == State::Closed
    }

    /// Advance to `to` if the handler is not closed and has not already
    /// passed it. Returns whether the transition happened.
    pub(crate) fn advance(&self, to: State) -> bool {
        debug_assert!(to != State::Closed);
        self.tx.send_if_modified(|state| {
            if *state == State::Closed || *state >= to {
                return false;
            }
            *state = to;
            true
        })
    }

    /// Transition to `Closed`. Returns true for exactly one caller; every
    /// later (or concurrent losing) caller gets false.
    pub(crate) fn close(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == State::Closed {
                return false;
            }
            *state = State::Closed;
            true
        })
    }

    /// Suspend until the state reaches `target` or the handler closes.
    /// Returns the state observed on wakeup.
    pub(crate) async fn wait_for(&self, target: State) -> State {
        let mut rx = self.tx.subscribe();
        // Copy the state out so the watch borrow ends inside this call.
        // The sender lives as long as `self`, so the error arm is
        // unreachable in practice.
        rx.wait_for(|state| *state >= target)
            .await
            .map(|state| *state)
            .unwrap_or(State::Closed)
    }

    /// Suspend until the handler closes.
    pub(crate) async fn closed(&self) {
        self.wait_for(State::Closed).await;
    }
}
