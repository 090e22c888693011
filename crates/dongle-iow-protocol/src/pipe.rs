//! HID transport boundary.

use std::io;
use std::time::Duration;

/// One opened IO-Warrior interface.
///
/// Reports are exchanged whole: byte 0 is the report id. `read_report`
/// returns `Ok(0)` when the read timeout elapses with nothing received.
pub trait HidPipe: Send {
    fn product_id(&self) -> u16;

    /// Firmware revision (USB bcdDevice).
    fn revision(&self) -> u16;

    fn serial_number(&self) -> Option<String>;

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> io::Result<()>;

    fn write_report(&mut self, report: &[u8]) -> io::Result<()>;

    fn read_report(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn close(&mut self) -> io::Result<()>;
}

impl<P: HidPipe + ?Sized> HidPipe for Box<P> {
    fn product_id(&self) -> u16 {
        (**self).product_id()
    }

    fn revision(&self) -> u16 {
        (**self).revision()
    }

    fn serial_number(&self) -> Option<String> {
        (**self).serial_number()
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> io::Result<()> {
        (**self).set_timeouts(read, write)
    }

    fn write_report(&mut self, report: &[u8]) -> io::Result<()> {
        (**self).write_report(report)
    }

    fn read_report(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_report(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

#[cfg(feature = "hidapi")]
pub use native::HidapiPipe;

#[cfg(feature = "hidapi")]
mod native {
    use super::HidPipe;
    use crate::ids::{IOW_VENDOR_ID, ReportLayout};
    use hidapi::{HidApi, HidDevice};
    use std::io;
    use std::time::Duration;
    use tracing::debug;

    fn hid_error(err: hidapi::HidError) -> io::Error {
        io::Error::other(err)
    }

    /// [`HidPipe`] backed by the `hidapi` crate.
    pub struct HidapiPipe {
        device: Option<HidDevice>,
        product_id: u16,
        revision: u16,
        serial_number: Option<String>,
        read_timeout_ms: i32,
    }

    impl HidapiPipe {
        /// Opens the I2C interface of the first IO-Warrior found, optionally
        /// restricted to one product id.
        pub fn open(product_id: Option<u16>) -> io::Result<Self> {
            let api = HidApi::new().map_err(hid_error)?;
            let first = api
                .device_list()
                .find(|d| {
                    d.vendor_id() == IOW_VENDOR_ID
                        && product_id.is_none_or(|pid| d.product_id() == pid)
                })
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "no IO-Warrior attached")
                })?;

            let pid = first.product_id();
            let serial = first.serial_number().map(str::to_string);
            let layout = ReportLayout::for_product(pid);

            let info = api
                .device_list()
                .find(|d| {
                    d.vendor_id() == IOW_VENDOR_ID
                        && d.product_id() == pid
                        && d.interface_number() == i32::from(layout.pipe)
                        && d.serial_number() == serial.as_deref()
                })
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("IO-Warrior 0x{pid:04X} has no interface {}", layout.pipe),
                    )
                })?;

            let device = info.open_device(&api).map_err(hid_error)?;
            debug!(
                product_id = pid,
                interface = layout.pipe,
                path = ?info.path(),
                "opened IO-Warrior interface"
            );

            Ok(Self {
                device: Some(device),
                product_id: pid,
                revision: info.release_number(),
                serial_number: serial,
                read_timeout_ms: 500,
            })
        }

        fn device(&self) -> io::Result<&HidDevice> {
            self.device
                .as_ref()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "pipe is closed"))
        }
    }

    impl HidPipe for HidapiPipe {
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
            self.read_timeout_ms = i32::try_from(read.as_millis()).unwrap_or(i32::MAX);
            // hidapi writes block until the report is queued
            debug!(write_ms = write.as_millis(), "HID write timeout not configurable");
            Ok(())
        }

        fn write_report(&mut self, report: &[u8]) -> io::Result<()> {
            let written = self.device()?.write(report).map_err(hid_error)?;
            if written < report.len() {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("wrote {written} of {} report bytes", report.len()),
                ));
            }
            Ok(())
        }

        fn read_report(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let timeout = self.read_timeout_ms;
            self.device()?.read_timeout(buf, timeout).map_err(hid_error)
        }

        fn close(&mut self) -> io::Result<()> {
            self.device = None;
            Ok(())
        }
    }
}
