//! # sockrelay
//!
//! A generic, reusable socket-handler lifecycle for framed connections.
//!
//! One [`Handler`] per accepted connection coordinates transport
//! attachment, stream initialization, and the first read across the
//! run-loop task and arbitrary caller tasks, without losing or
//! duplicating messages. Each
//! decoded inbound message is delivered to a shared [`Processor`], either
//! inline on the read loop or on a spawned worker, per the processor's
//! [`DispatchPolicy`].
//!
//! ## What this crate is not
//!
//! It defines no protocol, no thread pool, and no serialization format.
//! The wire framing is supplied through the [`Framing`] trait (any
//! tokio-util codec pair slots in), message routing lives in the
//! [`Processor`], and connection acceptance belongs to the caller.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use sockrelay::{Handler, LineFraming, Processor};
//!
//! // `Router` implements Processor<String>.
//! let router: Arc<Router> = Arc::new(Router::default());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:7000").await?;
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     let handler = Handler::attached(stream, router.clone(), LineFraming::new());
//!     tokio::spawn(handler.run());
//! }
//! ```
//!
//! Outbound delivery goes through [`Handler::push`] from any task; it
//! suspends until the handler finishes initializing and fails with
//! [`HandlerError::NotOpen`] once the handler is closed. [`Handler::close`]
//! is idempotent and safe to race with an in-progress read.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod dispatch;
mod error;
mod framing;
mod handler;
mod lifecycle;
mod line;
mod processor;
mod transport;

pub use error::{HandlerError, Result};
pub use framing::Framing;
pub use handler::Handler;
pub use lifecycle::State;
pub use line::{LineDecoder, LineEncoder, LineFraming, DEFAULT_MAX_LINE_LEN};
pub use processor::{DispatchPolicy, HandlerId, Processor, SocketHandler};
pub use transport::{Transport, TransportHandle};
