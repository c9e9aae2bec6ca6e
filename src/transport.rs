//! Transport abstraction and the read-only handle exposed to callers.
//!
//! A handler exclusively owns its transport: only the run loop reads from
//! it, and only `push`/`close` write to or shut it down. Outside callers
//! get a [`TransportHandle`] snapshot instead of the stream itself.

use std::fmt;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// An already-connected bidirectional byte stream a handler can own.
///
/// The core treats the stream as opaque beyond reading, writing, and
/// shutdown. Address introspection is optional so in-memory streams
/// (used in tests) qualify too.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Remote address of the connection, when the stream has one.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// Local address of the connection, when the stream has one.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

impl Transport for TcpStream {
    fn peer_addr(&self) -> Option<SocketAddr> {
        TcpStream::peer_addr(self).ok()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        TcpStream::local_addr(self).ok()
    }
}

impl Transport for tokio::io::DuplexStream {}

/// Read-only view of a handler's bound transport.
///
/// Captured once at attachment; grants no ownership and no mutation
/// rights over the underlying stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportHandle {
    peer: Option<SocketAddr>,
    local: Option<SocketAddr>,
}

impl TransportHandle {
    pub(crate) fn of<S: Transport>(stream: &S) -> Self {
        Self {
            peer: stream.peer_addr(),
            local: stream.local_addr(),
        }
    }

    /// Remote address of the bound transport, if known.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Local address of the bound transport, if known.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }
}

impl fmt::Display for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peer {
            Some(addr) => write!(f, "{addr}"),
            None => write!(f, "<no peer address>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_of_duplex_has_no_addresses() {
        let (a, _b) = tokio::io::duplex(64);
        let handle = TransportHandle::of(&a);
        assert_eq!(handle.peer_addr(), None);
        assert_eq!(handle.local_addr(), None);
        assert_eq!(handle.to_string(), "<no peer address>");
    }

    #[tokio::test]
    async fn handle_of_tcp_snapshots_addresses() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();

        let handle = TransportHandle::of(&server);
        assert_eq!(handle.peer_addr(), client.local_addr().ok());
        assert_eq!(handle.local_addr(), Some(addr));
        assert_eq!(handle.to_string(), client.local_addr().unwrap().to_string());
    }
}
