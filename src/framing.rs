//! Framing contract supplied by the wire-format layer.
//!
//! The core knows nothing about the bytes on the wire. A [`Framing`]
//! implementation performs one-time stream setup and hands back the
//! codec pair the handler uses to frame reads and writes. Decoding and
//! encoding follow the tokio-util [`Decoder`]/[`Encoder`] traits, so any
//! existing codec slots in directly.

use std::io;

use async_trait::async_trait;
use tokio_util::codec::{Decoder, Encoder};

use crate::transport::Transport;

/// Subclass seam of the handler: stream initialization plus the framed
/// read/write halves.
///
/// `initialize` runs exactly once per handler, after attachment and
/// before the first read. It receives the raw stream so implementations
/// can exchange preamble bytes (version banners, TLS-style negotiation
/// handled elsewhere, etc.) before framing begins.
#[async_trait]
pub trait Framing<S: Transport>: Send + 'static {
    /// The decoded message type flowing through the handler.
    type Message: Send + 'static;

    /// Decodes one inbound message per frame. `Ok(None)` at end of stream
    /// ends the read loop.
    type Decoder: Decoder<Item = Self::Message, Error = io::Error> + Send + 'static;

    /// Encodes exactly one outbound message per `push`.
    type Encoder: Encoder<Self::Message, Error = io::Error> + Send + 'static;

    /// One-time setup of the stream's read/write state. Any error here is
    /// terminal to the handler.
    async fn initialize(
        &mut self,
        io: &mut S,
    ) -> io::Result<(Self::Decoder, Self::Encoder)>;
}
