//! ELV USB-I2C adapter.
//!
//! The ELV dongle is driven over a serial port with ASCII command lines:
//! every bus byte travels as two uppercase hex digits, and a transaction is
//! wrapped in `S … P` start/stop markers. Responses come back as `XX `
//! groups followed by CR/LF.
//!
//! [`protocol`] holds the pure frame codec; [`ElvDongle`] drives it over any
//! [`SerialLink`](i2cdongles_core::SerialLink).

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod dongle;
pub mod protocol;
pub mod settings;

pub use dongle::{ElvDongle, MacroDump};
pub use protocol::{
    BAUD_RATE, DEFAULT_PORT, DESYNC_DELAY_MS, DESYNC_RETRIES, ERROR_PREFIXES, IDENTITY_PREFIX, INFO_RESPONSE_LEN,
    MACRO_RESPONSE_LEN, READ_TIMEOUT_MS, RESET_SETTLE_MS, admin, decode_hex_groups,
    encode_admin, encode_hex_groups, encode_read_request, encode_write, is_error_text,
    response_len,
};
pub use settings::ElvSettings;
