//! Serial transport boundary.

use std::io;

/// Byte-stream transport used by the serial adapters.
///
/// Reads honour the transport's own timeout: a read returns whatever arrived
/// before the timeout elapsed, which may be less than requested.
pub trait SerialLink: Send {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Reads until `buf` is full or the read timeout elapses.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Number of bytes already received and not yet read.
    fn bytes_pending(&mut self) -> io::Result<usize>;

    fn close(&mut self) -> io::Result<()>;

    /// Reads up to `len` bytes.
    fn read_up_to(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let read = self.read_bytes(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }
}

impl<L: SerialLink + ?Sized> SerialLink for Box<L> {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).write_frame(frame)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_bytes(buf)
    }

    fn bytes_pending(&mut self) -> io::Result<usize> {
        (**self).bytes_pending()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

#[cfg(feature = "serial")]
pub use system::SystemSerialLink;

#[cfg(feature = "serial")]
mod system {
    use super::SerialLink;
    use serialport::SerialPort;
    use std::io::{self, Read, Write};
    use std::time::Duration;
    use tracing::{debug, info};

    /// [`SerialLink`] over an OS serial port.
    pub struct SystemSerialLink {
        path: String,
        port: Option<Box<dyn SerialPort>>,
    }

    impl SystemSerialLink {
        pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> io::Result<Self> {
            let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
            info!(path, baud_rate, timeout_ms = timeout.as_millis(), "serial port opened");
            Ok(Self {
                path: path.to_string(),
                port: Some(port),
            })
        }

        pub fn path(&self) -> &str {
            &self.path
        }

        fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
            self.port.as_mut().ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotConnected, "serial port is closed")
            })
        }
    }

    impl SerialLink for SystemSerialLink {
        fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
            let port = self.port()?;
            port.write_all(frame)?;
            port.flush()
        }

        fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let port = self.port()?;
            let mut filled = 0;
            while let Some(rest) = buf.get_mut(filled..) {
                if rest.is_empty() {
                    break;
                }
                match port.read(rest) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            Ok(filled)
        }

        fn bytes_pending(&mut self) -> io::Result<usize> {
            let pending = self.port()?.bytes_to_read()?;
            Ok(usize::try_from(pending).unwrap_or(usize::MAX))
        }

        fn close(&mut self) -> io::Result<()> {
            if self.port.take().is_some() {
                debug!(path = %self.path, "serial port closed");
            }
            Ok(())
        }
    }
}
