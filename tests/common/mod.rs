//! Shared test fixtures: a counting mock processor, an in-memory
//! transport that counts shutdowns, and a framing wrapper that counts
//! initializations.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sockrelay::{
    DispatchPolicy, Framing, HandlerId, LineDecoder, LineEncoder, LineFraming, Processor,
    SocketHandler, Transport,
};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

/// Processor that records registrations, deregistrations, and delivery
/// events, and forwards every completed `input` over a channel.
pub struct MockProcessor {
    policy: DispatchPolicy,
    input_delay: Duration,
    pub attached: AtomicUsize,
    pub removed: AtomicUsize,
    /// `start:<msg>` / `end:<msg>` pairs in observed order.
    pub events: Mutex<Vec<String>>,
    delivered: mpsc::UnboundedSender<String>,
}

impl MockProcessor {
    pub fn new(policy: DispatchPolicy) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::with_delay(policy, Duration::ZERO)
    }

    /// A processor whose `input` takes `delay` to complete, for probing
    /// whether dispatch gates the read loop.
    pub fn with_delay(
        policy: DispatchPolicy,
        delay: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let processor = Arc::new(Self {
            policy,
            input_delay: delay,
            attached: AtomicUsize::new(0),
            removed: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
            delivered: tx,
        });
        (processor, rx)
    }

    pub fn event_index(&self, event: &str) -> Option<usize> {
        self.events.lock().iter().position(|e| e == event)
    }
}

#[async_trait]
impl Processor<String> for MockProcessor {
    async fn input(&self, msg: String) {
        self.events.lock().push(format!("start:{msg}"));
        if !self.input_delay.is_zero() {
            tokio::time::sleep(self.input_delay).await;
        }
        self.events.lock().push(format!("end:{msg}"));
        let _ = self.delivered.send(msg);
    }

    fn attach_handler(&self, _handler: Arc<dyn SocketHandler<String>>) {
        self.attached.fetch_add(1, Ordering::SeqCst);
    }

    fn remove_handler(&self, _id: HandlerId) {
        self.removed.fetch_add(1, Ordering::SeqCst);
    }

    fn dispatch_policy(&self) -> DispatchPolicy {
        self.policy
    }
}

/// In-memory transport whose write-side shutdowns are counted, so tests
/// can assert the transport is closed exactly once.
pub struct CountingStream {
    inner: DuplexStream,
    shutdowns: Arc<AtomicUsize>,
}

impl CountingStream {
    /// Returns the far end, the counting near end, and the shutdown
    /// counter.
    pub fn pair(capacity: usize) -> (DuplexStream, CountingStream, Arc<AtomicUsize>) {
        let (far, near) = tokio::io::duplex(capacity);
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let stream = CountingStream {
            inner: near,
            shutdowns: Arc::clone(&shutdowns),
        };
        (far, stream, shutdowns)
    }
}

impl AsyncRead for CountingStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for CountingStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_shutdown(cx);
        if poll.is_ready() {
            this.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
        poll
    }
}

impl Transport for CountingStream {}

/// Line framing that counts how many times `initialize` runs.
pub struct CountingFraming {
    inner: LineFraming,
    inits: Arc<AtomicUsize>,
}

impl CountingFraming {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let inits = Arc::new(AtomicUsize::new(0));
        let framing = Self {
            inner: LineFraming::new(),
            inits: Arc::clone(&inits),
        };
        (framing, inits)
    }
}

#[async_trait]
impl<S: Transport> Framing<S> for CountingFraming {
    type Message = String;
    type Decoder = LineDecoder;
    type Encoder = LineEncoder;

    async fn initialize(&mut self, io: &mut S) -> io::Result<(LineDecoder, LineEncoder)> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        <LineFraming as Framing<S>>::initialize(&mut self.inner, io).await
    }
}

/// Poll `cond` until it holds or two seconds elapse.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
