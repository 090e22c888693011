//! Response accumulation with a bounded drain.

use crate::link::SerialLink;
use std::borrow::Cow;
use std::io;
use tracing::{debug, warn};

/// Upper bound on single-byte reads during one drain.
pub const DEFAULT_DRAIN_LIMIT: usize = 256;

/// Bytes read back from a transport for one response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads up to `len` bytes, stopping early on timeout.
    pub fn fill_from<L: SerialLink + ?Sized>(
        &mut self,
        link: &mut L,
        len: usize,
    ) -> io::Result<usize> {
        let chunk = link.read_up_to(len)?;
        let read = chunk.len();
        self.bytes.extend_from_slice(&chunk);
        Ok(read)
    }

    /// Reads single bytes while the link reports pending input, so nothing
    /// stale is left for the next transaction. Stops after `limit` bytes.
    pub fn drain_from<L: SerialLink + ?Sized>(
        &mut self,
        link: &mut L,
        limit: usize,
    ) -> io::Result<usize> {
        let mut drained = 0;
        while link.bytes_pending()? > 0 {
            if drained >= limit {
                warn!(drained, limit, "drain limit reached with bytes still pending");
                break;
            }
            let mut byte = [0u8; 1];
            if link.read_bytes(&mut byte)? == 0 {
                break;
            }
            self.bytes.extend_from_slice(&byte);
            drained += 1;
        }
        if drained > 0 {
            debug!(drained, "drained trailing bytes");
        }
        Ok(drained)
    }

    /// Strips trailing CR and LF bytes.
    pub fn trim_line_end(&mut self) {
        while matches!(self.bytes.last(), Some(b'\r' | b'\n')) {
            self.bytes.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for ResponseBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}
