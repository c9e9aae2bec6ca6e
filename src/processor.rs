//! Processor contract and the object-safe handler view it receives.
//!
//! The processor is an external collaborator shared by many handlers; it
//! must tolerate concurrent `input` / `attach_handler` / `remove_handler`
//! calls. The core performs no locking on its behalf.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::transport::TransportHandle;

/// Unique identity of a handler, stable for its whole lifetime.
///
/// Used for deregistration so processors can key handler registries
/// without comparing trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

impl HandlerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How inbound messages are delivered to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// Deliver on the read-loop task; each `input` completes before the
    /// next read resumes, so the processor observes messages in wire
    /// order.
    #[default]
    Blocking,
    /// Deliver on a freshly spawned task; the read loop is never gated on
    /// `input` and delivery order is unspecified.
    ///
    /// There is no bound on in-flight deliveries: a slow processor under
    /// sustained load accumulates tasks without limit. Callers who need
    /// flow control should use `Blocking` or meter inside `input`.
    Concurrent,
}

/// Object-safe view of a handler, as seen by its processor.
///
/// [`Handler`](crate::Handler) implements this; processors hold
/// `Arc<dyn SocketHandler<T>>` so heterogeneous framings can share one
/// registry.
#[async_trait]
pub trait SocketHandler<T>: Send + Sync {
    /// This handler's identity.
    fn id(&self) -> HandlerId;

    /// Read-only view of the bound transport; `None` before attachment.
    fn transport(&self) -> Option<TransportHandle>;

    /// Deliver one outbound message. See [`Handler::push`](crate::Handler::push).
    async fn push(&self, msg: T) -> Result<()>;

    /// Tear the connection down. See [`Handler::close`](crate::Handler::close).
    async fn close(&self);
}

/// Receives decoded inbound messages and tracks handler registrations.
#[async_trait]
pub trait Processor<T>: Send + Sync + 'static {
    /// Deliver one decoded inbound message. Fire-and-forget: nothing is
    /// acknowledged back to the handler.
    async fn input(&self, msg: T);

    /// Called by a handler when a transport is attached to it.
    fn attach_handler(&self, handler: Arc<dyn SocketHandler<T>>);

    /// Called by a handler exactly once when it closes.
    fn remove_handler(&self, id: HandlerId);

    /// Whether inbound dispatch runs inline on the read loop or on a
    /// spawned worker. Consulted per message, so a processor may switch
    /// modes at runtime.
    fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy::Blocking
    }
}
