//! IO-Warrior special-mode report layout and builders.
//!
//! Byte 0 of every report is the report id. Write and read-setup reports
//! carry a flags/count byte at offset 1 and payload from offset 2, so a
//! report of capacity `N` carries at most `N - 2` bus bytes.

use i2cdongles_core::{AdapterKind, DongleError, DongleResult, HexBytes};
use std::fmt;

pub const MAX_REPORT_LEN: usize = 64;

/// Report ids used in I2C mode.
pub mod report_ids {
    /// Enable/disable I2C mode (host to device).
    pub const MODE_CONFIG: u8 = 0x01;
    /// Bus write (host to device) and its acknowledgment (device to host).
    pub const WRITE: u8 = 0x02;
    /// Read setup (host to device) and read result (device to host).
    pub const READ: u8 = 0x03;
}

/// Bits of the flags byte.
pub mod flags {
    /// Generate a start condition (write) or error (ACK / read result).
    pub const START: u8 = 0x80;
    pub const ERROR: u8 = 0x80;
    /// Generate a stop condition.
    pub const STOP: u8 = 0x40;

    /// Mode-config byte 2: disable internal pull-ups (IOW24, for 3.3 V).
    pub const DISABLE_PULLUPS: u8 = 0x80;
    /// Mode-config byte 2: speak Sensibus instead of I2C.
    pub const SENSIBUS: u8 = 0x40;
}

/// Mode-config byte 3: longest bus timeout, 256 x 500 us.
const MAX_BUS_TIMEOUT: u8 = 0x00;
const ENABLE_I2C: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportCapacity {
    /// IOW24, IOW40 and most other models.
    Short,
    /// IOW28 and IOW56.
    Long,
}

impl ReportCapacity {
    pub const fn len(self) -> usize {
        match self {
            Self::Short => 8,
            Self::Long => MAX_REPORT_LEN,
        }
    }

    /// Bus bytes per write or read report.
    pub const fn chunk_len(self) -> usize {
        self.len() - 2
    }
}

/// A fixed-capacity HID report.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ReportFrame {
    bytes: [u8; MAX_REPORT_LEN],
    len: usize,
}

impl ReportFrame {
    pub fn zeroed(capacity: ReportCapacity) -> Self {
        Self {
            bytes: [0u8; MAX_REPORT_LEN],
            len: capacity.len(),
        }
    }

    /// Copies a received report, zero-padded to the capacity.
    pub fn received(capacity: ReportCapacity, data: &[u8]) -> Self {
        let mut frame = Self::zeroed(capacity);
        for (slot, byte) in frame.as_mut_bytes().iter_mut().zip(data) {
            *slot = *byte;
        }
        frame
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.get(..self.len).unwrap_or_default()
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        self.bytes.get_mut(..self.len).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn byte(&self, index: usize) -> u8 {
        self.as_bytes().get(index).copied().unwrap_or(0)
    }

    fn set(&mut self, index: usize, value: u8) {
        if let Some(slot) = self.as_mut_bytes().get_mut(index) {
            *slot = value;
        }
    }

    pub fn kind(&self) -> u8 {
        self.byte(0)
    }

    pub fn flags(&self) -> u8 {
        self.byte(1)
    }

    /// Error bit of an ACK or read-result report.
    pub fn has_error(&self) -> bool {
        self.flags() & flags::ERROR != 0
    }

    pub fn payload(&self) -> &[u8] {
        self.as_bytes().get(2..).unwrap_or_default()
    }
}

impl fmt::Debug for ReportFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReportFrame[{}]", self)
    }
}

/// Hex dump with trailing zero padding elided.
impl fmt::Display for ReportFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        let used = bytes
            .iter()
            .rposition(|b| *b != 0)
            .map_or(2, |last| last.saturating_add(1).max(2))
            .min(bytes.len());
        write!(f, "{}", HexBytes(bytes.get(..used).unwrap_or_default()))?;
        if used < bytes.len() {
            f.write_str(" ...")?;
        }
        Ok(())
    }
}

/// I2C mode options sent with the mode-config report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    pub disable_pullups: bool,
    pub sensibus: bool,
}

impl ModeFlags {
    pub const fn bits(self) -> u8 {
        let mut bits = 0;
        if self.disable_pullups {
            bits |= flags::DISABLE_PULLUPS;
        }
        if self.sensibus {
            bits |= flags::SENSIBUS;
        }
        bits
    }
}

/// `[0x01, 0x01, flags, 0x00, …]`: enable I2C mode.
pub fn mode_config(capacity: ReportCapacity, mode: ModeFlags) -> ReportFrame {
    let mut frame = ReportFrame::zeroed(capacity);
    frame.set(0, report_ids::MODE_CONFIG);
    frame.set(1, ENABLE_I2C);
    frame.set(2, mode.bits());
    frame.set(3, MAX_BUS_TIMEOUT);
    frame
}

/// Flags byte of a write report carrying `len` bus bytes.
pub fn write_flags(len: usize, start: bool, stop: bool) -> u8 {
    let mut bits = u8::try_from(len).unwrap_or(u8::MAX) & !(flags::START | flags::STOP);
    if start {
        bits |= flags::START;
    }
    if stop {
        bits |= flags::STOP;
    }
    bits
}

/// One write report; `chunk` must fit in [`ReportCapacity::chunk_len`].
pub fn write_report(
    capacity: ReportCapacity,
    chunk: &[u8],
    start: bool,
    stop: bool,
) -> DongleResult<ReportFrame> {
    if chunk.len() > capacity.chunk_len() {
        return Err(DongleError::InvalidTransaction(format!(
            "{} write report holds at most {} bytes, got {}",
            AdapterKind::Iow,
            capacity.chunk_len(),
            chunk.len()
        )));
    }
    Ok(fill_write(capacity, chunk, start, stop))
}

pub(crate) fn fill_write(
    capacity: ReportCapacity,
    chunk: &[u8],
    start: bool,
    stop: bool,
) -> ReportFrame {
    let mut frame = ReportFrame::zeroed(capacity);
    let chunk = chunk.get(..capacity.chunk_len()).unwrap_or(chunk);
    frame.set(0, report_ids::WRITE);
    frame.set(1, write_flags(chunk.len(), start, stop));
    for (slot, byte) in frame.as_mut_bytes().iter_mut().skip(2).zip(chunk) {
        *slot = *byte;
    }
    frame
}

/// `[0x03, count, target, …]` where `target` is the read address byte, or
/// the sensor command in Sensibus mode.
pub fn read_setup(capacity: ReportCapacity, count: u8, target: u8) -> ReportFrame {
    let mut frame = ReportFrame::zeroed(capacity);
    frame.set(0, report_ids::READ);
    frame.set(1, count);
    frame.set(2, target);
    frame
}
