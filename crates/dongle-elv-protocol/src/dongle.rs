//! ELV session: handshake, transactions and admin commands.

use crate::protocol::{
    IDENTITY_PREFIX, INFO_RESPONSE_LEN, MACRO_RESPONSE_LEN, admin, decode_hex_groups,
    encode_admin, encode_read_request, encode_write, is_error_text, response_len,
};
use crate::settings::ElvSettings;
use i2cdongles_core::{
    AdapterKind, DongleError, DongleResult, I2cAdapter, I2cTransaction, ResponseBuffer,
    SerialLink,
};
use std::cmp::Ordering;
use std::fmt;
use std::io;
use tracing::{debug, info, warn};

const KIND: AdapterKind = AdapterKind::Elv;

/// Bytes to read for the banner printed after a reset.
const RESET_RESPONSE_LEN: usize = 100;

/// Width of one displayed row of macro memory.
const MACRO_ROW_WIDTH: usize = 64;

fn transport(err: io::Error) -> DongleError {
    DongleError::transport(KIND, err)
}

/// An open ELV USB-I2C session.
pub struct ElvDongle<L: SerialLink> {
    link: L,
    settings: ElvSettings,
    identity: String,
    open: bool,
}

#[cfg(feature = "serial")]
impl ElvDongle<i2cdongles_core::SystemSerialLink> {
    /// Opens the configured serial port and runs the handshake.
    pub fn open(settings: ElvSettings) -> DongleResult<Self> {
        let link = i2cdongles_core::SystemSerialLink::open(
            &settings.port,
            settings.baud_rate,
            settings.timeout(),
        )
        .map_err(|e| DongleError::init(KIND, format!("cannot open {}: {e}", settings.port)))?;
        Self::with_link(link, settings)
    }
}

impl<L: SerialLink> ElvDongle<L> {
    /// Runs the handshake over an already open link.
    ///
    /// The dongle's macro is stopped and ACK/NACK echo disabled; the
    /// identity reply must start with `ELV`.
    pub fn with_link(link: L, settings: ElvSettings) -> DongleResult<Self> {
        let mut dongle = Self {
            link,
            settings,
            identity: String::new(),
            open: true,
        };

        let identity = dongle
            .write_admin(admin::HANDSHAKE)
            .and_then(|()| dongle.read_admin(INFO_RESPONSE_LEN))
            .map_err(|e| DongleError::init(KIND, format!("handshake failed: {e}")))?;

        if !identity.starts_with(IDENTITY_PREFIX) {
            return Err(DongleError::init(
                KIND,
                format!("dongle did not identify itself, got {identity:?}"),
            ));
        }

        info!(
            identity = identity.lines().next().unwrap_or_default(),
            "ELV dongle initialized"
        );
        dongle.identity = identity;
        Ok(dongle)
    }

    /// Identity text returned by the handshake.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn settings(&self) -> &ElvSettings {
        &self.settings
    }

    fn ensure_open(&self) -> DongleResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DongleError::Closed(KIND))
        }
    }

    fn send(&mut self, frame: &str) -> DongleResult<()> {
        debug!(frame, "ELV tx");
        self.link.write_frame(frame.as_bytes()).map_err(transport)
    }

    fn receive(&mut self, len: usize) -> DongleResult<ResponseBuffer> {
        let mut buf = ResponseBuffer::new();
        buf.fill_from(&mut self.link, len).map_err(transport)?;
        let drained = buf
            .drain_from(&mut self.link, self.settings.drain_limit)
            .map_err(transport)?;
        if drained > 0 {
            warn!(drained, "ELV sent bytes beyond the expected response");
        }
        debug!(response = %buf.as_text().escape_debug(), "ELV rx");
        Ok(buf)
    }

    /// Sends a read request and decodes exactly `count` bytes from the reply.
    fn read_response(&mut self, request: &str, count: usize) -> DongleResult<Vec<u8>> {
        self.send(request)?;
        let mut buf = self.receive(response_len(count))?;
        buf.trim_line_end();

        let text = buf.as_text();
        if is_error_text(&text) {
            warn!(text = %text.trim(), "ELV reported an error");
            return Err(DongleError::DeviceMessage {
                adapter: KIND,
                text: text.trim().to_string(),
            });
        }

        let mut data = decode_hex_groups(buf.as_slice())?;
        match data.len().cmp(&count) {
            Ordering::Less => Err(DongleError::ShortResponse {
                adapter: KIND,
                expected: count,
                received: data.len(),
            }),
            Ordering::Greater => {
                warn!(
                    expected = count,
                    received = data.len(),
                    "discarding surplus ELV response bytes"
                );
                data.truncate(count);
                Ok(data)
            }
            Ordering::Equal => Ok(data),
        }
    }

    /// Sends an administrative command, uppercased.
    pub fn write_admin(&mut self, command: &str) -> DongleResult<()> {
        self.ensure_open()?;
        self.send(&encode_admin(command))
    }

    /// Reads an administrative reply of up to `len` bytes, trimmed.
    pub fn read_admin(&mut self, len: usize) -> DongleResult<String> {
        self.ensure_open()?;
        let buf = self.receive(len)?;
        Ok(buf.as_text().trim().to_string())
    }

    /// Resets the dongle and returns its start-up banner.
    pub fn reset(&mut self) -> DongleResult<String> {
        self.write_admin(admin::RESET)?;
        std::thread::sleep(self.settings.reset_settle());
        self.read_admin(RESET_RESPONSE_LEN)
    }

    /// Start-up info text.
    pub fn show_info(&mut self) -> DongleResult<String> {
        self.write_admin(admin::SHOW_INFO)?;
        self.read_admin(INFO_RESPONSE_LEN)
    }

    /// Macro memory contents.
    pub fn show_macro(&mut self) -> DongleResult<MacroDump> {
        self.write_admin(admin::SHOW_MACRO)?;
        let text = self.read_admin(MACRO_RESPONSE_LEN)?;
        Ok(MacroDump::parse(&text))
    }
}

impl<L: SerialLink> I2cAdapter for ElvDongle<L> {
    fn kind(&self) -> AdapterKind {
        KIND
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn execute(&mut self, tx: &I2cTransaction) -> DongleResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        let read_request = if tx.has_read_phase() {
            Some(encode_read_request(tx.address(), tx.read_len())?)
        } else {
            None
        };

        self.send(&encode_write(tx.address(), tx.write_bytes()))?;

        let Some(read_request) = read_request else {
            return Ok(None);
        };

        tx.wait_for_sensor();
        let mut retries = 0u8;
        loop {
            match self.read_response(&read_request, tx.read_len()) {
                Err(DongleError::ProtocolDesync { detail, .. })
                    if retries < self.settings.desync_retries =>
                {
                    retries = retries.saturating_add(1);
                    warn!(retry = retries, %detail, "garbled ELV response, re-sending read request");
                    std::thread::sleep(self.settings.desync_delay());
                }
                result => return result.map(Some),
            }
        }
    }

    fn close(&mut self) -> DongleResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.link.close().map_err(transport)?;
        info!("ELV dongle closed");
        Ok(())
    }
}

impl<L: SerialLink> Drop for ElvDongle<L> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close ELV dongle: {e}");
        }
    }
}

/// Macro memory listing returned by [`ElvDongle::show_macro`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MacroDump {
    pub header: String,
    pub body: String,
    pub footer: String,
}

impl MacroDump {
    /// Splits the `U` reply into its header, body and footer lines.
    pub fn parse(text: &str) -> Self {
        let mut lines = text.split("\r\n");
        Self {
            header: lines.next().unwrap_or_default().to_string(),
            body: lines.next().unwrap_or_default().to_string(),
            footer: lines.next().unwrap_or_default().to_string(),
        }
    }

    /// The body in fixed-width display rows.
    pub fn rows(&self) -> Vec<String> {
        let chars: Vec<char> = self.body.chars().collect();
        chars
            .chunks(MACRO_ROW_WIDTH)
            .map(|row| row.iter().collect())
            .collect()
    }
}

impl fmt::Display for MacroDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        for row in self.rows() {
            writeln!(f, "{row} |")?;
        }
        write!(f, "{}", self.footer)
    }
}
