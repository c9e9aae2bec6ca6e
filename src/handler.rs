//! The per-connection handler core.
//!
//! A [`Handler`] coordinates transport attachment, stream
//! initialization, and the first read across the run-loop task and
//! arbitrary caller tasks, then drives the framed read loop until end of
//! stream, a transport error, or [`Handler::close`].
//!
//! ```text
//!   attach(stream)          run()                      push(msg)
//!        │                    │                            │
//!        ▼                    ▼                            ▼
//!   Created ──► Attached ──► initialize ──► Initialized ──► write
//!                                 │              │
//!                                 ▼              ▼
//!                             read loop ──► dispatch (inline or spawned)
//!
//!   close() from any task, any state ──► Closed (terminal, idempotent)
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::WriteHalf;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

use crate::dispatch::Dispatch;
use crate::error::{HandlerError, Result};
use crate::framing::Framing;
use crate::lifecycle::{Lifecycle, State};
use crate::processor::{DispatchPolicy, HandlerId, Processor, SocketHandler};
use crate::transport::{Transport, TransportHandle};

/// Per-connection handler: owns one transport, references one processor,
/// and runs the read loop on its own task.
///
/// Generic over the transport stream `S` and the framing layer `F`; the
/// message type is `F::Message`. One instance per accepted connection.
pub struct Handler<S: Transport, F: Framing<S>> {
    id: HandlerId,
    processor: Arc<dyn Processor<F::Message>>,
    lifecycle: Lifecycle,
    /// The run loop executes at most once, even if `run` is called again.
    started: AtomicBool,
    /// Stream parked between `attach` and the run loop claiming it.
    io: Mutex<Option<S>>,
    /// Framing parked between construction and initialization.
    framing: Mutex<Option<F>>,
    /// Address snapshot taken at attachment.
    handle: Mutex<Option<TransportHandle>>,
    /// Write half, present from initialization until close. The async
    /// mutex serializes concurrent `push` callers.
    writer: tokio::sync::Mutex<Option<FramedWrite<WriteHalf<S>, F::Encoder>>>,
}

impl<S: Transport, F: Framing<S>> Handler<S, F> {
    /// Create a handler bound to `processor`, without a transport yet.
    pub fn new(processor: Arc<dyn Processor<F::Message>>, framing: F) -> Arc<Self> {
        Arc::new(Self {
            id: HandlerId::new(),
            processor,
            lifecycle: Lifecycle::new(),
            started: AtomicBool::new(false),
            io: Mutex::new(None),
            framing: Mutex::new(Some(framing)),
            handle: Mutex::new(None),
            writer: tokio::sync::Mutex::new(None),
        })
    }

    /// Create a handler and attach `stream` immediately.
    pub fn attached(
        stream: S,
        processor: Arc<dyn Processor<F::Message>>,
        framing: F,
    ) -> Arc<Self> {
        let handler = Self::new(processor, framing);
        // A freshly constructed handler is always attachable.
        let _ = handler.attach(stream);
        handler
    }

    /// This handler's identity.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.lifecycle.state()
    }

    /// Read-only view of the bound transport; `None` before attachment.
    pub fn transport(&self) -> Option<TransportHandle> {
        *self.handle.lock()
    }

    /// Bind the transport, register with the processor, and wake the run
    /// loop if it is already waiting.
    ///
    /// Attachment is one-time and consuming: a second call fails with
    /// [`HandlerError::AlreadyAttached`], and attaching to a closed
    /// handler fails with [`HandlerError::NotOpen`].
    pub fn attach(self: &Arc<Self>, stream: S) -> Result<()> {
        {
            // The stream slot is the claim: checking and filling it under
            // one lock leaves concurrent attachers exactly one winner,
            // and only the winner goes on to register with the processor.
            let mut slot = self.io.lock();
            match self.lifecycle.state() {
                State::Created => {}
                State::Closed => return Err(HandlerError::NotOpen),
                State::Attached | State::Initialized => {
                    return Err(HandlerError::AlreadyAttached)
                }
            }
            if slot.is_some() {
                return Err(HandlerError::AlreadyAttached);
            }
            *self.handle.lock() = Some(TransportHandle::of(&stream));
            *slot = Some(stream);
        }

        let this: Arc<dyn SocketHandler<F::Message>> = self.clone();
        self.processor.attach_handler(this);
        self.lifecycle.advance(State::Attached);
        debug!(handler = %self.id, transport = ?self.transport(), "transport attached");
        Ok(())
    }

    /// Run-loop entry point, intended to be spawned as its own task.
    ///
    /// A second invocation, or an invocation on a closed handler, returns
    /// immediately. Otherwise: wait for attachment, initialize the stream
    /// exactly once, unblock `push` callers, then read and dispatch until
    /// end of stream, a transport error, or close. Errors never propagate
    /// to the caller; any failure ends in [`Handler::close`].
    pub async fn run(self: Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) || self.lifecycle.is_closed() {
            return;
        }

        if let Err(e) = self.serve().await {
            // A read torn down by an intentional close is expected;
            // reporting it would make every disconnect look like a fault.
            // Best effort: a close recorded just after this check still
            // reports the error.
            if self.lifecycle.is_closed() {
                debug!(handler = %self.id, error = %e, "read error after close, suppressed");
            } else {
                warn!(handler = %self.id, error = %e, "read loop failed");
            }
        }

        self.close().await;
    }

    /// Attachment wait, initialization, and the framed read loop.
    async fn serve(&self) -> io::Result<()> {
        if self.lifecycle.wait_for(State::Attached).await == State::Closed {
            // Closed before (or racing) attachment; nothing to read.
            return Ok(());
        }

        let mut stream = match self.io.lock().take() {
            Some(stream) => stream,
            // Attached implies the stream is present; a concurrent close
            // may have drained it first.
            None => return Ok(()),
        };
        let mut framing = match self.framing.lock().take() {
            Some(framing) => framing,
            None => return Ok(()),
        };

        let (decoder, encoder) = framing.initialize(&mut stream).await?;

        let (read_half, write_half) = tokio::io::split(stream);
        *self.writer.lock().await = Some(FramedWrite::new(write_half, encoder));

        if !self.lifecycle.advance(State::Initialized) {
            // Closed during initialization; shut down the write half we
            // installed after close already looked for it.
            if let Some(mut writer) = self.writer.lock().await.take() {
                if let Err(e) = writer.close().await {
                    debug!(handler = %self.id, error = %e, "transport shutdown error");
                }
            }
            return Ok(());
        }
        debug!(handler = %self.id, "stream initialized");

        let mut frames = FramedRead::new(read_half, decoder);
        loop {
            tokio::select! {
                () = self.lifecycle.closed() => return Ok(()),
                next = frames.next() => match next {
                    Some(Ok(msg)) => self.dispatch(msg).await,
                    Some(Err(e)) => return Err(e),
                    None => {
                        debug!(handler = %self.id, "end of stream");
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Forward one decoded message per the processor's dispatch policy.
    async fn dispatch(&self, msg: F::Message) {
        let unit = Dispatch::new(msg, Arc::clone(&self.processor));
        match self.processor.dispatch_policy() {
            DispatchPolicy::Blocking => unit.deliver().await,
            DispatchPolicy::Concurrent => unit.spawn(),
        }
    }

    /// Deliver one outbound message.
    ///
    /// Callable from any task, any number of times, concurrently.
    /// Suspends until the handler is initialized; on a closed handler it
    /// fails with [`HandlerError::NotOpen`] without attempting a write.
    /// Concurrent callers are serialized; there is no queueing beyond
    /// that.
    pub async fn push(&self, msg: F::Message) -> Result<()> {
        if self.lifecycle.wait_for(State::Initialized).await == State::Closed {
            return Err(HandlerError::NotOpen);
        }

        let mut slot = self.writer.lock().await;
        let writer = slot.as_mut().ok_or(HandlerError::NotOpen)?;
        writer.send(msg).await?;
        Ok(())
    }

    /// Tear the connection down.
    ///
    /// Idempotent: the first caller (from any task) deregisters the
    /// handler from the processor and shuts the transport down; every
    /// later caller returns immediately. A shutdown error is logged and
    /// never prevents close from completing.
    pub async fn close(&self) {
        if !self.lifecycle.close() {
            return;
        }
        debug!(handler = %self.id, "closing");

        self.processor.remove_handler(self.id);

        // Stream never claimed by a run loop (closed before run/attach
        // completed); dropping it releases the connection.
        drop(self.io.lock().take());
        drop(self.framing.lock().take());

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.close().await {
                debug!(handler = %self.id, error = %e, "transport shutdown error");
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: Transport, F: Framing<S>> SocketHandler<F::Message> for Handler<S, F> {
    fn id(&self) -> HandlerId {
        Handler::id(self)
    }

    fn transport(&self) -> Option<TransportHandle> {
        Handler::transport(self)
    }

    async fn push(&self, msg: F::Message) -> Result<()> {
        Handler::push(self, msg).await
    }

    async fn close(&self) {
        Handler::close(self).await;
    }
}
