//! In-memory transports for tests.

use crate::link::SerialLink;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct LinkState {
    inbound: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    connected: bool,
    closed: bool,
}

/// Scripted [`SerialLink`].
///
/// Each written frame releases the next queued reply into the inbound
/// buffer, the way a dongle answers a command. Clones share state, so a test
/// can keep a handle after moving the link into an adapter.
#[derive(Debug, Clone)]
pub struct MockSerialLink {
    state: Arc<Mutex<LinkState>>,
}

impl MockSerialLink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LinkState {
                connected: true,
                ..LinkState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues the reply to the next written frame.
    pub fn reply_with(&self, bytes: impl AsRef<[u8]>) {
        self.state().replies.push_back(bytes.as_ref().to_vec());
    }

    /// The next written frame gets no reply.
    pub fn reply_silently(&self) {
        self.state().replies.push_back(Vec::new());
    }

    /// Makes bytes readable immediately.
    pub fn inject(&self, bytes: impl AsRef<[u8]>) {
        self.state().inbound.extend(bytes.as_ref());
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    pub fn written_text(&self) -> Vec<String> {
        self.state()
            .writes
            .iter()
            .map(|frame| String::from_utf8_lossy(frame).into_owned())
            .collect()
    }

    pub fn pending_replies(&self) -> usize {
        self.state().replies.len()
    }

    pub fn disconnect(&self) {
        self.state().connected = false;
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn check_usable(state: &LinkState) -> io::Result<()> {
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "link is closed"));
        }
        if !state.connected {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        Ok(())
    }
}

impl Default for MockSerialLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialLink for MockSerialLink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let mut state = self.state();
        Self::check_usable(&state)?;
        state.writes.push(frame.to_vec());
        if let Some(reply) = state.replies.pop_front() {
            state.inbound.extend(reply);
        }
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        Self::check_usable(&state)?;
        let mut read = 0;
        for slot in buf.iter_mut() {
            match state.inbound.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    read += 1;
                }
                None => break,
            }
        }
        Ok(read)
    }

    fn bytes_pending(&mut self) -> io::Result<usize> {
        let state = self.state();
        Self::check_usable(&state)?;
        Ok(state.inbound.len())
    }

    fn close(&mut self) -> io::Result<()> {
        self.state().closed = true;
        Ok(())
    }
}
