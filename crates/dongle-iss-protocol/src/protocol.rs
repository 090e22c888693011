//! USB-ISS command encoding.

use i2cdongles_core::{AdapterKind, DongleError, DongleResult, SlaveAddress};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_PORT: &str = "/dev/ttyACM0";
pub const BAUD_RATE: u32 = 115_200;
pub const READ_TIMEOUT_MS: u64 = 200;

/// Module id reported by every USB-ISS.
pub const MODULE_ID: u8 = 0x07;

/// Reply to a successful mode change.
pub const MODE_ACK: [u8; 2] = [0xFF, 0x00];

/// I/O1 driven low, I/O2 driven high while in I2C mode.
pub const IO_PIN_TYPES: u8 = 0x04;

pub const VERSION_RESPONSE_LEN: usize = 3;
pub const SERIAL_NUMBER_LEN: usize = 8;

/// I2C transfer opcodes.
pub mod opcodes {
    /// Write, or read with at most one register byte.
    pub const I2C_AD1: u8 = 0x55;
    /// Read with two register bytes.
    pub const I2C_AD2: u8 = 0x56;
}

/// Module management commands, sent after [`iss_commands::PREFIX`].
pub mod iss_commands {
    pub const PREFIX: u8 = 0x5A;
    pub const VERSION: u8 = 0x01;
    pub const SET_MODE: u8 = 0x02;
    pub const SERIAL_NUMBER: u8 = 0x03;
}

/// Bus clock and driver selection for `SET_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum I2cMode {
    Software20k,
    Software50k,
    Software100k,
    Software400k,
    #[default]
    Hardware100k,
    Hardware400k,
    Hardware1000k,
}

impl I2cMode {
    pub const fn byte(self) -> u8 {
        match self {
            Self::Software20k => 0x20,
            Self::Software50k => 0x30,
            Self::Software100k => 0x40,
            Self::Software400k => 0x50,
            Self::Hardware100k => 0x60,
            Self::Hardware400k => 0x70,
            Self::Hardware1000k => 0x80,
        }
    }

    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x20 => Some(Self::Software20k),
            0x30 => Some(Self::Software50k),
            0x40 => Some(Self::Software100k),
            0x50 => Some(Self::Software400k),
            0x60 => Some(Self::Hardware100k),
            0x70 => Some(Self::Hardware400k),
            0x80 => Some(Self::Hardware1000k),
            _ => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Software20k => "software I2C, 20 kHz",
            Self::Software50k => "software I2C, 50 kHz",
            Self::Software100k => "software I2C, 100 kHz",
            Self::Software400k => "software I2C, 400 kHz",
            Self::Hardware100k => "hardware I2C, 100 kHz",
            Self::Hardware400k => "hardware I2C, 400 kHz",
            Self::Hardware1000k => "hardware I2C, 1 MHz",
        }
    }
}

pub const fn version_query() -> [u8; 2] {
    [iss_commands::PREFIX, iss_commands::VERSION]
}

pub const fn serial_number_query() -> [u8; 2] {
    [iss_commands::PREFIX, iss_commands::SERIAL_NUMBER]
}

pub const fn set_mode_command(mode: I2cMode) -> [u8; 4] {
    [
        iss_commands::PREFIX,
        iss_commands::SET_MODE,
        mode.byte(),
        IO_PIN_TYPES,
    ]
}

pub fn encode_write(address: SlaveAddress, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len().saturating_add(2));
    frame.push(opcodes::I2C_AD1);
    frame.push(address.write_byte());
    frame.extend_from_slice(data);
    frame
}

/// Opcode for a read preceded by `register_len` register bytes.
pub const fn read_opcode(register_len: usize) -> u8 {
    if register_len <= 1 {
        opcodes::I2C_AD1
    } else {
        opcodes::I2C_AD2
    }
}

/// Read setup: opcode, read address, the register bytes, then the count.
pub fn encode_read_request(
    address: SlaveAddress,
    register: &[u8],
    count: usize,
) -> DongleResult<Vec<u8>> {
    let Ok(count) = u8::try_from(count) else {
        return Err(DongleError::InvalidTransaction(format!(
            "{} reads at most 255 bytes, {count} requested",
            AdapterKind::Iss
        )));
    };
    if register.len() > 2 {
        warn!(
            register_len = register.len(),
            "USB-ISS only defines one or two register bytes; sending with I2C_AD2"
        );
    }

    let mut frame = Vec::with_capacity(register.len().saturating_add(3));
    frame.push(read_opcode(register.len()));
    frame.push(address.read_byte());
    frame.extend_from_slice(register);
    frame.push(count);
    Ok(frame)
}

/// Reply to the version query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssVersion {
    pub module_id: u8,
    pub firmware: u8,
    pub mode: u8,
}

impl IssVersion {
    pub fn parse(reply: &[u8]) -> Option<Self> {
        match reply {
            [module_id, firmware, mode, ..] => Some(Self {
                module_id: *module_id,
                firmware: *firmware,
                mode: *mode,
            }),
            _ => None,
        }
    }

    pub fn i2c_mode(&self) -> Option<I2cMode> {
        I2cMode::from_byte(self.mode)
    }
}
