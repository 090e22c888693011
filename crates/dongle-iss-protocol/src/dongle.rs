//! USB-ISS session.

use crate::protocol::{
    I2cMode, IssVersion, MODE_ACK, MODULE_ID, SERIAL_NUMBER_LEN, VERSION_RESPONSE_LEN,
    encode_read_request, encode_write, serial_number_query, set_mode_command, version_query,
};
use crate::settings::IssSettings;
use i2cdongles_core::{
    AdapterKind, DongleError, DongleResult, HexBytes, I2cAdapter, I2cTransaction,
    ResponseBuffer, SerialLink,
};
use std::cmp::Ordering;
use std::fmt;
use std::io;
use tracing::{debug, info, warn};

const KIND: AdapterKind = AdapterKind::Iss;

fn transport(err: io::Error) -> DongleError {
    DongleError::transport(KIND, err)
}

/// Module details reported by [`IssDongle::show_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssInfo {
    pub version: IssVersion,
    pub serial_number: String,
}

impl fmt::Display for IssInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Module ID:      0x{:02X}", self.version.module_id)?;
        writeln!(f, "Firmware:       0x{:02X}", self.version.firmware)?;
        match self.version.i2c_mode() {
            Some(mode) => writeln!(
                f,
                "Operating mode: 0x{:02X} ({})",
                self.version.mode,
                mode.description()
            )?,
            None => writeln!(f, "Operating mode: 0x{:02X}", self.version.mode)?,
        }
        write!(f, "Serial number:  {}", self.serial_number)
    }
}

/// An open USB-ISS session in I2C mode.
pub struct IssDongle<L: SerialLink> {
    link: L,
    settings: IssSettings,
    version: IssVersion,
    open: bool,
}

#[cfg(feature = "serial")]
impl IssDongle<i2cdongles_core::SystemSerialLink> {
    /// Opens the configured serial port and runs the handshake.
    pub fn open(settings: IssSettings) -> DongleResult<Self> {
        let link = i2cdongles_core::SystemSerialLink::open(
            &settings.port,
            settings.baud_rate,
            settings.timeout(),
        )
        .map_err(|e| DongleError::init(KIND, format!("cannot open {}: {e}", settings.port)))?;
        Self::with_link(link, settings)
    }
}

impl<L: SerialLink> IssDongle<L> {
    /// Checks the module id and switches the module into I2C mode.
    pub fn with_link(link: L, settings: IssSettings) -> DongleResult<Self> {
        let mut dongle = Self {
            link,
            settings,
            version: IssVersion {
                module_id: 0,
                firmware: 0,
                mode: 0,
            },
            open: true,
        };

        let version = dongle
            .query_version()
            .map_err(|e| DongleError::init(KIND, format!("version query failed: {e}")))?;
        if version.module_id != MODULE_ID {
            return Err(DongleError::init(
                KIND,
                format!(
                    "module id 0x{:02X}, expected 0x{MODULE_ID:02X}",
                    version.module_id
                ),
            ));
        }
        dongle.version = version;

        let mode = dongle.settings.mode;
        let ack = dongle
            .admin(&set_mode_command(mode), MODE_ACK.len())
            .map_err(|e| DongleError::init(KIND, format!("set mode failed: {e}")))?;
        if ack != MODE_ACK {
            return Err(DongleError::init(
                KIND,
                format!("mode change to {} rejected: [{}]", mode.description(), HexBytes(&ack)),
            ));
        }

        info!(
            firmware = version.firmware,
            mode = mode.description(),
            "ISS dongle initialized"
        );
        Ok(dongle)
    }

    pub fn settings(&self) -> &IssSettings {
        &self.settings
    }

    /// Version reported during the handshake.
    pub fn version(&self) -> IssVersion {
        self.version
    }

    pub fn mode(&self) -> I2cMode {
        self.settings.mode
    }

    fn ensure_open(&self) -> DongleResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DongleError::Closed(KIND))
        }
    }

    fn send(&mut self, frame: &[u8]) -> DongleResult<()> {
        debug!(frame = %HexBytes(frame), "ISS tx");
        self.link.write_frame(frame).map_err(transport)
    }

    fn receive(&mut self, len: usize) -> DongleResult<Vec<u8>> {
        let mut buf = ResponseBuffer::new();
        buf.fill_from(&mut self.link, len).map_err(transport)?;
        let drained = buf
            .drain_from(&mut self.link, self.settings.drain_limit)
            .map_err(transport)?;
        if drained > 0 {
            warn!(drained, "ISS sent bytes beyond the expected response");
        }
        debug!(response = %HexBytes(buf.as_slice()), "ISS rx");
        Ok(buf.into_vec())
    }

    /// Sends a module command and reads its reply.
    fn admin(&mut self, command: &[u8], reply_len: usize) -> DongleResult<Vec<u8>> {
        self.ensure_open()?;
        self.send(command)?;
        self.receive(reply_len)
    }

    fn query_version(&mut self) -> DongleResult<IssVersion> {
        let reply = self.admin(&version_query(), VERSION_RESPONSE_LEN)?;
        IssVersion::parse(&reply).ok_or(DongleError::ShortResponse {
            adapter: KIND,
            expected: VERSION_RESPONSE_LEN,
            received: reply.len(),
        })
    }

    /// Module id, firmware, operating mode and serial number.
    pub fn show_info(&mut self) -> DongleResult<IssInfo> {
        let version = self.query_version()?;
        let serial = self.admin(&serial_number_query(), SERIAL_NUMBER_LEN)?;
        Ok(IssInfo {
            version,
            serial_number: String::from_utf8_lossy(&serial).trim().to_string(),
        })
    }

    /// The module has no reset command.
    pub fn reset(&mut self) -> DongleResult<()> {
        Err(DongleError::Unsupported {
            adapter: KIND,
            operation: "reset",
        })
    }
}

impl<L: SerialLink> I2cAdapter for IssDongle<L> {
    fn kind(&self) -> AdapterKind {
        KIND
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn execute(&mut self, tx: &I2cTransaction) -> DongleResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        let read_request = if tx.has_read_phase() {
            Some(encode_read_request(
                tx.address(),
                tx.write_bytes(),
                tx.read_len(),
            )?)
        } else {
            None
        };

        self.send(&encode_write(tx.address(), tx.write_bytes()))?;

        let Some(read_request) = read_request else {
            return Ok(None);
        };

        tx.wait_for_sensor();
        self.send(&read_request)?;

        let mut data = self.receive(tx.read_len())?;
        match data.len().cmp(&tx.read_len()) {
            Ordering::Less => Err(DongleError::ShortResponse {
                adapter: KIND,
                expected: tx.read_len(),
                received: data.len(),
            }),
            Ordering::Greater => {
                warn!(
                    expected = tx.read_len(),
                    received = data.len(),
                    "discarding surplus ISS response bytes"
                );
                data.truncate(tx.read_len());
                Ok(Some(data))
            }
            Ordering::Equal => Ok(Some(data)),
        }
    }

    fn close(&mut self) -> DongleResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.link.close().map_err(transport)?;
        info!("ISS dongle closed");
        Ok(())
    }
}

impl<L: SerialLink> Drop for IssDongle<L> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close ISS dongle: {e}");
        }
    }
}
