//! Newline-delimited line framing.
//!
//! A ready-made [`Framing`] for protocols that exchange UTF-8 lines, and
//! the framing the integration tests run against. Lines are capped at a
//! configurable length (default 512 bytes) to bound memory on hostile
//! input.

use std::io;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::framing::Framing;
use crate::transport::Transport;

/// Default maximum line length in bytes, terminator included.
pub const DEFAULT_MAX_LINE_LEN: usize = 512;

/// Line framing: newline-terminated UTF-8 strings.
#[derive(Debug, Clone)]
pub struct LineFraming {
    max_len: usize,
}

impl LineFraming {
    /// Create a framing with the default line-length cap.
    pub fn new() -> Self {
        Self {
            max_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    /// Create a framing with a custom line-length cap.
    pub fn with_max_len(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl Default for LineFraming {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: Transport> Framing<S> for LineFraming {
    type Message = String;
    type Decoder = LineDecoder;
    type Encoder = LineEncoder;

    async fn initialize(&mut self, _io: &mut S) -> io::Result<(LineDecoder, LineEncoder)> {
        Ok((LineDecoder::new(self.max_len), LineEncoder))
    }
}

/// Decoder half: yields one `String` per `\n`-terminated line, with any
/// trailing `\r` stripped.
#[derive(Debug)]
pub struct LineDecoder {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
}

impl LineDecoder {
    fn new(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Decoder for LineDecoder {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        // Look for newline starting from where the last scan left off
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line of {} bytes exceeds limit of {}", line.len(), self.max_len),
                ));
            }

            let text = std::str::from_utf8(&line).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("invalid utf-8: {e}"))
            })?;

            Ok(Some(text.trim_end_matches(['\r', '\n']).to_owned()))
        } else {
            // No complete line yet; remember where the scan stopped
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "partial line of {} bytes exceeds limit of {}",
                        src.len(),
                        self.max_len
                    ),
                ));
            }

            Ok(None)
        }
    }
}

/// Encoder half: writes the line followed by `\n`.
#[derive(Debug)]
pub struct LineEncoder;

impl Encoder<String> for LineEncoder {
    type Error = io::Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> io::Result<()> {
        if line.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "line contains embedded newline",
            ));
        }
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
