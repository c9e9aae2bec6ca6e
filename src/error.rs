//! Error types for the socket-handler lifecycle.
//!
//! Only [`Handler::push`](crate::Handler::push) and
//! [`Handler::attach`](crate::Handler::attach) surface errors to callers.
//! Read-loop and close-path I/O failures are logged and terminate the
//! handler instead of propagating.

use thiserror::Error;

/// Convenience type alias for Results using [`HandlerError`].
pub type Result<T, E = HandlerError> = std::result::Result<T, E>;

/// Errors surfaced by handler operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// The handler is closed (or was never opened); nothing can be written.
    #[error("socket not open")]
    NotOpen,

    /// A transport was already attached to this handler.
    ///
    /// Attachment is a one-time, consuming operation. Re-attaching would
    /// silently drop the bound transport and double-register the handler
    /// with its processor, so the second call is rejected instead.
    #[error("transport already attached")]
    AlreadyAttached,

    /// I/O error while writing to the transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
