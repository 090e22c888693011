//! Code Mercenaries IO-Warrior adapter.
//!
//! In I2C special mode the IO-Warrior exchanges fixed-size HID reports
//! (8 bytes, or 64 on IOW28/IOW56). A bus write is split into report-sized
//! chunks with start/stop flags, acknowledged by a status report, and a read
//! is requested with a read-setup report and collected from one or more
//! result reports.
//!
//! The report codec ([`report`]), write planner ([`chunk`]) and ACK state
//! machine ([`ack`]) are I/O-free. [`IowDongle`] drives them over any
//! [`HidPipe`]; the `hidapi` feature provides the native backend.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod ack;
pub mod chunk;
pub mod dongle;
pub mod ids;
pub mod mock;
pub mod pipe;
pub mod report;
pub mod settings;

pub use ack::{AckOutcome, AckPolicy, AckStep, AckTracker};
pub use chunk::plan_write_reports;
pub use dongle::{IowDongle, IowInfo};
pub use ids::{IOW_VENDOR_ID, ReportLayout, device_name, pipes, product_ids};
pub use pipe::HidPipe;
#[cfg(feature = "hidapi")]
pub use pipe::HidapiPipe;
pub use report::{
    MAX_REPORT_LEN, ModeFlags, ReportCapacity, ReportFrame, flags, mode_config, read_setup,
    report_ids, write_flags, write_report,
};
pub use settings::IowSettings;
