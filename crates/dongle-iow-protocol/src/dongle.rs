//! IO-Warrior session.

use crate::ack::{AckOutcome, AckStep, AckTracker};
use crate::chunk::plan_write_reports;
use crate::ids::{ReportLayout, device_name};
use crate::pipe::HidPipe;
use crate::report::{MAX_REPORT_LEN, ReportFrame, mode_config, read_setup, report_ids};
use crate::settings::IowSettings;
use i2cdongles_core::{AdapterKind, DongleError, DongleResult, I2cAdapter, I2cTransaction};
use std::fmt;
use std::io;
use tracing::{debug, info, warn};

const KIND: AdapterKind = AdapterKind::Iow;

fn transport(err: io::Error) -> DongleError {
    DongleError::transport(KIND, err)
}

/// Device details reported by [`IowDongle::show_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IowInfo {
    pub product_id: u16,
    pub name: &'static str,
    pub revision: u16,
    pub serial_number: Option<String>,
    pub report_len: usize,
    pub pipe: u8,
}

impl fmt::Display for IowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Product:        0x{:04X} ({})", self.product_id, self.name)?;
        writeln!(f, "Firmware:       0x{:04X}", self.revision)?;
        writeln!(
            f,
            "Serial number:  {}",
            self.serial_number.as_deref().unwrap_or("(none)")
        )?;
        writeln!(f, "Report size:    {} bytes", self.report_len)?;
        write!(f, "Pipe:           {}", self.pipe)
    }
}

/// An open IO-Warrior session in I2C mode.
pub struct IowDongle<P: HidPipe> {
    pipe: P,
    settings: IowSettings,
    layout: ReportLayout,
    last_ack: Option<AckOutcome>,
    open: bool,
}

#[cfg(feature = "hidapi")]
impl IowDongle<crate::pipe::HidapiPipe> {
    /// Opens the first attached IO-Warrior and enables I2C mode.
    pub fn open(settings: IowSettings) -> DongleResult<Self> {
        let pipe = crate::pipe::HidapiPipe::open(settings.product_id)
            .map_err(|e| DongleError::init(KIND, format!("cannot open IO-Warrior: {e}")))?;
        Self::with_pipe(pipe, settings)
    }
}

impl<P: HidPipe> IowDongle<P> {
    /// Configures timeouts and sends the mode-config report.
    pub fn with_pipe(pipe: P, settings: IowSettings) -> DongleResult<Self> {
        let layout = ReportLayout::for_product(pipe.product_id());
        let mut dongle = Self {
            pipe,
            settings,
            layout,
            last_ack: None,
            open: true,
        };

        dongle
            .pipe
            .set_timeouts(dongle.settings.read_timeout(), dongle.settings.write_timeout())
            .map_err(|e| DongleError::init(KIND, format!("cannot set timeouts: {e}")))?;

        let mode = dongle.settings.mode_flags();
        let report = mode_config(layout.capacity, mode);
        dongle
            .send(&report)
            .map_err(|e| DongleError::init(KIND, format!("cannot enable I2C mode: {e}")))?;

        info!(
            device = device_name(dongle.pipe.product_id()),
            report_len = layout.capacity.len(),
            pipe = layout.pipe,
            pullups = !mode.disable_pullups,
            sensibus = mode.sensibus,
            "IOW dongle initialized"
        );
        Ok(dongle)
    }

    pub fn settings(&self) -> &IowSettings {
        &self.settings
    }

    pub fn layout(&self) -> ReportLayout {
        self.layout
    }

    /// Acknowledgment summary of the most recent acknowledged write.
    pub fn last_ack(&self) -> Option<AckOutcome> {
        self.last_ack
    }

    pub fn show_info(&self) -> DongleResult<IowInfo> {
        self.ensure_open()?;
        let product_id = self.pipe.product_id();
        Ok(IowInfo {
            product_id,
            name: device_name(product_id),
            revision: self.pipe.revision(),
            serial_number: self.pipe.serial_number(),
            report_len: self.layout.capacity.len(),
            pipe: self.layout.pipe,
        })
    }

    fn ensure_open(&self) -> DongleResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DongleError::Closed(KIND))
        }
    }

    fn send(&mut self, report: &ReportFrame) -> DongleResult<()> {
        debug!(%report, "IOW tx");
        self.pipe.write_report(report.as_bytes()).map_err(transport)
    }

    /// Next report, or `None` when the read timeout elapsed.
    fn receive(&mut self) -> DongleResult<Option<ReportFrame>> {
        let mut buf = [0u8; MAX_REPORT_LEN];
        let len = self.layout.capacity.len();
        let read = self
            .pipe
            .read_report(buf.get_mut(..len).unwrap_or_default())
            .map_err(transport)?;
        if read == 0 {
            return Ok(None);
        }
        let report = ReportFrame::received(self.layout.capacity, buf.get(..read).unwrap_or_default());
        debug!(%report, "IOW rx");
        Ok(Some(report))
    }

    fn send_all(&mut self, reports: &[ReportFrame]) -> DongleResult<()> {
        reports.iter().try_for_each(|report| self.send(report))
    }

    /// Sends the write reports until the adapter acknowledges them.
    fn write_acknowledged(&mut self, reports: &[ReportFrame]) -> DongleResult<AckOutcome> {
        let mut tracker = AckTracker::new(self.settings.ack_policy());
        loop {
            self.send_all(reports)?;
            let report = self
                .receive()?
                .unwrap_or_else(|| ReportFrame::zeroed(self.layout.capacity));

            match tracker.observe(&report) {
                AckStep::Accepted => break,
                AckStep::RetryAfterNack { retry } => {
                    warn!(retry, "IOW write not acknowledged, retrying write");
                }
                AckStep::RetryAfterDesync { retry, kind } => {
                    warn!(retry, kind, "unexpected IOW report kind, retrying write");
                    std::thread::sleep(tracker.policy().desync_delay);
                }
                AckStep::ForceContinue { attempts } => {
                    let err = DongleError::Acknowledgment {
                        adapter: KIND,
                        attempts,
                    };
                    warn!("{err}; continuing anyway");
                    break;
                }
                AckStep::GiveUp { retries, kind } => {
                    return Err(DongleError::desync(
                        KIND,
                        format!("expected acknowledgment report, got kind {kind} after {retries} retries"),
                    ));
                }
            }
        }
        Ok(tracker.outcome())
    }

    /// Collects read results until `count` payload bytes have arrived.
    fn read_results(&mut self, count: usize) -> DongleResult<Vec<u8>> {
        let limit = self.settings.stray_report_limit;
        let mut data = Vec::with_capacity(count.saturating_add(MAX_REPORT_LEN));
        let mut discarded = 0usize;

        while data.len() < count {
            let Some(report) = self.receive()? else {
                return Err(DongleError::ShortResponse {
                    adapter: KIND,
                    expected: count,
                    received: data.len(),
                });
            };

            if report.kind() == report_ids::READ && !report.has_error() {
                data.extend_from_slice(report.payload());
                continue;
            }

            discarded = discarded.saturating_add(1);
            if report.kind() == report_ids::READ {
                warn!(discarded, "IOW read report has the error bit set, discarding");
            } else {
                warn!(discarded, kind = report.kind(), "discarding unexpected IOW report");
            }
            if discarded > limit {
                return Err(DongleError::desync(
                    KIND,
                    format!("{discarded} read reports discarded"),
                ));
            }
        }

        data.truncate(count);
        Ok(data)
    }
}

impl<P: HidPipe> I2cAdapter for IowDongle<P> {
    fn kind(&self) -> AdapterKind {
        KIND
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn execute(&mut self, tx: &I2cTransaction) -> DongleResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        let Ok(count) = u8::try_from(tx.read_len()) else {
            return Err(DongleError::InvalidTransaction(format!(
                "{KIND} reads at most {} bytes, requested {}",
                u8::MAX,
                tx.read_len()
            )));
        };

        let address = tx.address();
        let sensibus = address.is_sensibus();
        let hold_open = tx.has_read_phase();

        // Sensibus reads carry the command in the read setup.
        if !(sensibus && hold_open) {
            let mut payload = Vec::with_capacity(tx.write_bytes().len().saturating_add(1));
            if !sensibus {
                payload.push(address.write_byte());
            }
            payload.extend_from_slice(tx.write_bytes());
            let reports = plan_write_reports(self.layout.capacity, &payload, hold_open);

            if sensibus {
                self.send_all(&reports)?;
            } else {
                self.last_ack = Some(self.write_acknowledged(&reports)?);
            }
        }

        if !tx.has_read_phase() {
            return Ok(None);
        }

        tx.wait_for_sensor();
        let target = if sensibus {
            tx.write_bytes().first().copied().unwrap_or(0)
        } else {
            address.read_byte()
        };
        self.send(&read_setup(self.layout.capacity, count, target))?;
        self.read_results(tx.read_len()).map(Some)
    }

    fn close(&mut self) -> DongleResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.pipe.close().map_err(transport)?;
        info!("IOW dongle closed");
        Ok(())
    }
}

impl<P: HidPipe> Drop for IowDongle<P> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close IOW dongle: {e}");
        }
    }
}
