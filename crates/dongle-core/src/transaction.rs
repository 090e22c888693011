//! The portable transaction contract.

use crate::address::SlaveAddress;
use crate::error::DongleResult;
use crate::hex::HexBytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Delays at or below this many milliseconds are not worth a sleep.
pub const MIN_SENSOR_WAIT_MS: u32 = 2;

/// The three supported adapter families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// ELV USB-I2C, ASCII-hex commands over a serial port.
    Elv,
    /// Devantech USB-ISS, binary commands over a serial port.
    Iss,
    /// Code Mercenaries IO-Warrior, HID reports.
    Iow,
}

impl AdapterKind {
    pub const ALL: [Self; 3] = [Self::Elv, Self::Iss, Self::Iow];

    pub const fn description(self) -> &'static str {
        match self {
            Self::Elv => "ELV USB-I2C",
            Self::Iss => "Devantech USB-ISS",
            Self::Iow => "Code Mercenaries IO-Warrior",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Elv => "ELV",
            Self::Iss => "ISS",
            Self::Iow => "IOW",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown adapter kind '{0}' (expected elv, iss or iow)")]
pub struct UnknownAdapterKind(pub String);

impl FromStr for AdapterKind {
    type Err = UnknownAdapterKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "elv" => Ok(Self::Elv),
            "iss" => Ok(Self::Iss),
            "iow" | "iowarrior" => Ok(Self::Iow),
            _ => Err(UnknownAdapterKind(s.to_string())),
        }
    }
}

/// One logical bus transaction: a write phase, optionally followed by a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cTransaction {
    address: SlaveAddress,
    write: Vec<u8>,
    read_len: usize,
    delay_ms: u32,
}

impl I2cTransaction {
    pub fn new(address: SlaveAddress, write: impl Into<Vec<u8>>) -> Self {
        Self {
            address,
            write: write.into(),
            read_len: 0,
            delay_ms: 0,
        }
    }

    /// Validating constructor for raw addresses.
    pub fn to(address: u8, write: impl Into<Vec<u8>>) -> DongleResult<Self> {
        Ok(Self::new(SlaveAddress::new(address)?, write))
    }

    pub fn with_read(mut self, len: usize) -> Self {
        self.read_len = len;
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn address(&self) -> SlaveAddress {
        self.address
    }

    pub fn write_bytes(&self) -> &[u8] {
        &self.write
    }

    pub fn read_len(&self) -> usize {
        self.read_len
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    pub fn has_read_phase(&self) -> bool {
        self.read_len > 0
    }

    /// How long to wait between the write and read phases, if at all.
    pub fn sensor_wait(&self) -> Option<Duration> {
        (self.has_read_phase() && self.delay_ms > MIN_SENSOR_WAIT_MS)
            .then(|| Duration::from_millis(u64::from(self.delay_ms)))
    }

    /// Blocks for the sensor's execution time before the read phase.
    pub fn wait_for_sensor(&self) {
        if let Some(wait) = self.sensor_wait() {
            debug!(address = %self.address, wait_ms = self.delay_ms, "waiting for sensor");
            std::thread::sleep(wait);
        }
    }
}

impl fmt::Display for I2cTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} write [{}]", self.address, HexBytes(&self.write))?;
        if self.has_read_phase() {
            write!(f, " read {}", self.read_len)?;
        }
        Ok(())
    }
}

/// Implemented by every adapter session.
///
/// Sessions are exclusive: each call blocks until the transport completes or
/// times out, and no two transactions overlap on one adapter.
pub trait I2cAdapter: Send {
    fn kind(&self) -> AdapterKind;

    fn is_open(&self) -> bool;

    /// Runs one transaction.
    ///
    /// Returns `None` for write-only transactions and exactly
    /// [`I2cTransaction::read_len`] bytes otherwise.
    fn execute(&mut self, tx: &I2cTransaction) -> DongleResult<Option<Vec<u8>>>;

    /// Releases the transport. Safe to call repeatedly and after failures.
    fn close(&mut self) -> DongleResult<()>;

    fn transact(
        &mut self,
        address: u8,
        write: &[u8],
        read_len: usize,
        delay_ms: u32,
    ) -> DongleResult<Option<Vec<u8>>> {
        let tx = I2cTransaction::to(address, write)?
            .with_read(read_len)
            .with_delay_ms(delay_ms);
        self.execute(&tx)
    }
}

impl<A: I2cAdapter + ?Sized> I2cAdapter for Box<A> {
    fn kind(&self) -> AdapterKind {
        (**self).kind()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn execute(&mut self, tx: &I2cTransaction) -> DongleResult<Option<Vec<u8>>> {
        (**self).execute(tx)
    }

    fn close(&mut self) -> DongleResult<()> {
        (**self).close()
    }
}
