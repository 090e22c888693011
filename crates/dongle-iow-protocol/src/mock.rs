//! In-memory [`HidPipe`] for tests.

use crate::ids::product_ids;
use crate::pipe::HidPipe;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct PipeState {
    inbound: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    timeouts: Option<(Duration, Duration)>,
    connected: bool,
    closed: bool,
}

/// Scripted IO-Warrior interface.
///
/// Queued reports are returned by `read_report` in order; an empty queue
/// behaves like a read timeout. Clones share state.
#[derive(Debug, Clone)]
pub struct MockHidPipe {
    product_id: u16,
    revision: u16,
    serial_number: Option<String>,
    state: Arc<Mutex<PipeState>>,
}

impl MockHidPipe {
    pub fn new(product_id: u16) -> Self {
        Self {
            product_id,
            revision: 0x1030,
            serial_number: Some("000012AB".to_string()),
            state: Arc::new(Mutex::new(PipeState {
                connected: true,
                ..PipeState::default()
            })),
        }
    }

    /// An IOW24 with 8-byte reports.
    pub fn iow24() -> Self {
        Self::new(product_ids::IOW24)
    }

    /// An IOW56 with 64-byte reports.
    pub fn iow56() -> Self {
        Self::new(product_ids::IOW56)
    }

    fn state(&self) -> MutexGuard<'_, PipeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn queue_report(&self, report: impl AsRef<[u8]>) {
        self.state().inbound.push_back(report.as_ref().to_vec());
    }

    /// Queues a write acknowledgment, with or without the error bit.
    pub fn queue_ack(&self, error: bool) {
        self.queue_report([0x02, if error { 0x80 } else { 0x00 }]);
    }

    /// Queues a read result carrying `data`.
    pub fn queue_read(&self, data: &[u8]) {
        let mut report = vec![0x03, u8::try_from(data.len()).unwrap_or(u8::MAX)];
        report.extend_from_slice(data);
        self.queue_report(report);
    }

    pub fn queued(&self) -> usize {
        self.state().inbound.len()
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    pub fn timeouts(&self) -> Option<(Duration, Duration)> {
        self.state().timeouts
    }

    pub fn disconnect(&self) {
        self.state().connected = false;
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn check_usable(state: &PipeState) -> io::Result<()> {
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "pipe is closed"));
        }
        if !state.connected {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        Ok(())
    }
}

impl HidPipe for MockHidPipe {
    fn product_id(&self) -> u16 {
        self.product_id
    }

    fn revision(&self) -> u16 {
        self.revision
    }

    fn serial_number(&self) -> Option<String> {
        self.serial_number.clone()
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> io::Result<()> {
        let mut state = self.state();
        Self::check_usable(&state)?;
        state.timeouts = Some((read, write));
        Ok(())
    }

    fn write_report(&mut self, report: &[u8]) -> io::Result<()> {
        let mut state = self.state();
        Self::check_usable(&state)?;
        state.writes.push(report.to_vec());
        Ok(())
    }

    fn read_report(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        Self::check_usable(&state)?;
        let Some(report) = state.inbound.pop_front() else {
            return Ok(0);
        };
        let len = report.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(&report) {
            *slot = *byte;
        }
        Ok(len)
    }

    fn close(&mut self) -> io::Result<()> {
        self.state().closed = true;
        Ok(())
    }
}
