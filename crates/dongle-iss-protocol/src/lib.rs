//! Devantech USB-ISS adapter.
//!
//! The USB-ISS enumerates as a CDC serial port and takes raw binary
//! commands. I2C traffic uses opcode `0x55` (one internal register byte) or
//! `0x56` (two), followed by the address byte; module management commands
//! are prefixed with `0x5A`.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod dongle;
pub mod protocol;
pub mod settings;

pub use dongle::{IssDongle, IssInfo};
pub use protocol::{
    BAUD_RATE, DEFAULT_PORT, I2cMode, IssVersion, MODE_ACK, MODULE_ID, READ_TIMEOUT_MS,
    encode_read_request, encode_write, iss_commands, opcodes, read_opcode, set_mode_command,
};
pub use settings::IssSettings;
