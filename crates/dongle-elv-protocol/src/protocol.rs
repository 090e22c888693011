//! ELV ASCII frame codec.
//!
//! Frames:
//! - write: `S <addr|0> <data…> P`
//! - read request: `S <addr|1> <count> P`
//! - read response: `XX XX … \r\n`, three characters per byte
//!
//! All hex is two-digit uppercase, separated by single spaces.

use i2cdongles_core::{AdapterKind, DongleError, DongleResult, HexBytes, SlaveAddress};

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const BAUD_RATE: u32 = 115_200;
pub const READ_TIMEOUT_MS: u64 = 200;

/// Identity responses start with this.
pub const IDENTITY_PREFIX: &str = "ELV";

pub const INFO_RESPONSE_LEN: usize = 140;
/// Header line, 255 macro bytes and the footer line.
pub const MACRO_RESPONSE_LEN: usize = 255 + 26;
/// A reset needs more than one second before the banner is readable.
pub const RESET_SETTLE_MS: u64 = 2000;

/// Read requests re-sent after a garbled reply, and the pause before each.
pub const DESYNC_RETRIES: u8 = 3;
pub const DESYNC_DELAY_MS: u64 = 50;

/// Prefixes of the dongle's own error messages.
pub const ERROR_PREFIXES: [&str; 2] = ["Solve ", "Err: "];

/// Administrative command strings, before uppercasing.
pub mod admin {
    /// Stop the macro (`<`), disable ACK/NACK echo (`y30`), identify (`?`).
    pub const HANDSHAKE: &str = "<y30?";
    pub const RESET: &str = "z4b";
    pub const SHOW_INFO: &str = "?";
    pub const SHOW_MACRO: &str = "U";
}

/// Admin commands go out uppercased.
pub fn encode_admin(command: &str) -> String {
    command.to_ascii_uppercase()
}

fn encode_frame(bytes: &[u8]) -> String {
    format!("S {} P", HexBytes(bytes))
}

pub fn encode_write(address: SlaveAddress, data: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(data.len().saturating_add(1));
    bytes.push(address.write_byte());
    bytes.extend_from_slice(data);
    encode_frame(&bytes)
}

pub fn encode_read_request(address: SlaveAddress, count: usize) -> DongleResult<String> {
    let Ok(count) = u8::try_from(count) else {
        return Err(DongleError::InvalidTransaction(format!(
            "{} reads at most 255 bytes, {count} requested",
            AdapterKind::Elv
        )));
    };
    Ok(encode_frame(&[address.read_byte(), count]))
}

/// Bytes to read for `count` data bytes: `XX ` per byte plus CR/LF.
pub const fn response_len(count: usize) -> usize {
    count.saturating_mul(3).saturating_add(2)
}

/// Response-side encoding, `XX ` per byte.
pub fn encode_hex_groups(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().saturating_mul(3));
    for &byte in bytes {
        out.push(hex_digit(byte >> 4));
        out.push(hex_digit(byte & 0x0F));
        out.push(' ');
    }
    out
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16)
        .map(|digit| digit.to_ascii_uppercase())
        .unwrap_or('0')
}

/// Parses `XX ` groups. Input that is not a whole number of groups decodes
/// to nothing; a group that is not hex is a desync.
pub fn decode_hex_groups(raw: &[u8]) -> DongleResult<Vec<u8>> {
    if !raw.len().is_multiple_of(3) {
        return Ok(Vec::new());
    }
    raw.chunks_exact(3).map(decode_group).collect()
}

fn decode_group(group: &[u8]) -> DongleResult<u8> {
    std::str::from_utf8(group)
        .ok()
        .map(str::trim)
        .filter(|digits| !digits.is_empty())
        .and_then(|digits| u8::from_str_radix(digits, 16).ok())
        .ok_or_else(|| {
            DongleError::desync(
                AdapterKind::Elv,
                format!(
                    "unparsable response group {:?}",
                    String::from_utf8_lossy(group)
                ),
            )
        })
}

/// True when the dongle answered with its own error text instead of data.
pub fn is_error_text(response: &str) -> bool {
    let trimmed = response.trim();
    ERROR_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
}
