//! IO-Warrior sessions driven over a scripted HID pipe.

use i2cdongles_core::{AdapterKind, DongleError, I2cAdapter};
use i2cdongles_iow::mock::MockHidPipe;
use i2cdongles_iow::{IowDongle, IowSettings, ReportCapacity, pipes};
use std::time::Duration;
use tracing_test::traced_test;

fn quick_settings() -> IowSettings {
    IowSettings {
        desync_delay_ms: 0,
        ..IowSettings::default()
    }
}

fn open_with(
    pipe: MockHidPipe,
    settings: IowSettings,
) -> Result<(MockHidPipe, IowDongle<MockHidPipe>), DongleError> {
    let dongle = IowDongle::with_pipe(pipe.clone(), settings)?;
    Ok((pipe, dongle))
}

fn open_iow24() -> Result<(MockHidPipe, IowDongle<MockHidPipe>), DongleError> {
    open_with(MockHidPipe::iow24(), quick_settings())
}

fn short(bytes: &[u8]) -> Vec<u8> {
    let mut report = bytes.to_vec();
    report.resize(8, 0);
    report
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[test]
#[traced_test]
fn handshake_enables_i2c_mode() -> Result<(), DongleError> {
    let (pipe, dongle) = open_iow24()?;
    assert_eq!(pipe.written(), vec![short(&[0x01, 0x01, 0x00, 0x00])]);
    assert_eq!(
        pipe.timeouts(),
        Some((Duration::from_millis(500), Duration::from_millis(500)))
    );
    assert_eq!(dongle.layout().capacity, ReportCapacity::Short);
    assert!(logs_contain("IOW dongle initialized"));
    Ok(())
}

#[test]
fn handshake_sets_pullup_and_sensibus_flags() -> Result<(), DongleError> {
    let settings = IowSettings {
        disable_pullups: true,
        sensibus: true,
        ..quick_settings()
    };
    let (pipe, _dongle) = open_with(MockHidPipe::iow24(), settings)?;
    assert_eq!(
        pipe.written().first().and_then(|r| r.get(2)).copied(),
        Some(0xC0)
    );
    Ok(())
}

#[test]
fn handshake_failure_is_fatal_and_releases_the_pipe() {
    let pipe = MockHidPipe::iow24();
    pipe.disconnect();
    let err = IowDongle::with_pipe(pipe.clone(), quick_settings()).err();
    assert!(matches!(
        err,
        Some(DongleError::Initialization {
            adapter: AdapterKind::Iow,
            ..
        })
    ));
    assert!(pipe.is_closed());
}

// ---------------------------------------------------------------------------
// Write phase
// ---------------------------------------------------------------------------

#[test]
fn write_only_transaction_sends_stop() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    pipe.queue_ack(false);

    assert_eq!(dongle.transact(0x48, &[0x01, 0x60], 0, 0)?, None);

    assert_eq!(
        pipe.written().get(1),
        Some(&short(&[0x02, 0xC3, 0x90, 0x01, 0x60]))
    );
    assert_eq!(dongle.last_ack().map(|a| a.nacks), Some(0));
    assert_eq!(pipe.queued(), 0);
    Ok(())
}

#[test]
fn register_select_holds_the_bus_for_the_read() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    pipe.queue_ack(false);
    pipe.queue_read(&[0x1A, 0x80]);

    let data = dongle.transact(0x48, &[0x00], 2, 0)?;

    assert_eq!(data, Some(vec![0x1A, 0x80]));
    let written = pipe.written();
    assert_eq!(written.get(1), Some(&short(&[0x02, 0x82, 0x90, 0x00])));
    assert_eq!(written.get(2), Some(&short(&[0x03, 0x02, 0x91])));
    Ok(())
}

#[test]
fn payload_one_byte_over_capacity_splits() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    pipe.queue_ack(false);
    pipe.queue_ack(false);

    // address byte + 5 data bytes fills one short report exactly
    dongle.transact(0x50, &[1, 2, 3, 4, 5], 0, 0)?;
    dongle.transact(0x50, &[1, 2, 3, 4, 5, 6], 0, 0)?;

    let written = pipe.written();
    assert_eq!(written.len(), 4);
    assert_eq!(written.get(1), Some(&vec![0x02, 0xC6, 0xA0, 1, 2, 3, 4, 5]));
    assert_eq!(written.get(2), Some(&vec![0x02, 0x86, 0xA0, 1, 2, 3, 4, 5]));
    assert_eq!(written.get(3), Some(&short(&[0x02, 0x41, 6])));
    Ok(())
}

#[test]
fn long_reports_on_iow56() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_with(MockHidPipe::iow56(), quick_settings())?;
    pipe.queue_ack(false);

    dongle.transact(0x50, &[0x55; 61], 0, 0)?;

    let written = pipe.written();
    assert_eq!(written.len(), 2);
    let report = written.get(1).cloned().unwrap_or_default();
    assert_eq!(report.len(), 64);
    assert_eq!(report.get(..3), Some(&[0x02, 0xFE, 0xA0][..]));
    Ok(())
}

// ---------------------------------------------------------------------------
// Acknowledgment
// ---------------------------------------------------------------------------

#[test]
#[traced_test]
fn two_nacks_then_ack_retries_twice() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    pipe.queue_ack(true);
    pipe.queue_ack(true);
    pipe.queue_ack(false);
    pipe.queue_read(&[0x1A, 0x80]);

    let data = dongle.transact(0x48, &[0x00], 2, 0)?;

    assert_eq!(data, Some(vec![0x1A, 0x80]));
    let register_writes = pipe
        .written()
        .iter()
        .filter(|r| r.first() == Some(&0x02))
        .count();
    assert_eq!(register_writes, 3);
    assert_eq!(dongle.last_ack().map(|a| (a.nacks, a.forced)), Some((2, false)));
    logs_assert(|lines: &[&str]| {
        match lines.iter().filter(|l| l.contains("retrying write")).count() {
            2 => Ok(()),
            n => Err(format!("expected 2 retries, logged {n}")),
        }
    });
    assert!(!logs_contain("continuing anyway"));
    Ok(())
}

#[test]
#[traced_test]
fn third_retry_can_still_be_acknowledged() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    for _ in 0..3 {
        pipe.queue_ack(true);
    }
    pipe.queue_ack(false);

    assert_eq!(dongle.transact(0x48, &[0x01, 0x60], 0, 0)?, None);

    let register_writes = pipe
        .written()
        .iter()
        .filter(|r| r.first() == Some(&0x02))
        .count();
    assert_eq!(register_writes, 4);
    assert_eq!(pipe.queued(), 0);
    assert_eq!(dongle.last_ack().map(|a| (a.nacks, a.forced)), Some((3, false)));
    logs_assert(|lines: &[&str]| {
        match lines.iter().filter(|l| l.contains("retrying write")).count() {
            3 => Ok(()),
            n => Err(format!("expected 3 retries, logged {n}")),
        }
    });
    assert!(!logs_contain("continuing anyway"));
    Ok(())
}

#[test]
#[traced_test]
fn four_nacks_force_the_transaction_through() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    for _ in 0..4 {
        pipe.queue_ack(true);
    }
    pipe.queue_read(&[0x42]);

    let data = dongle.transact(0x48, &[0x00], 1, 0)?;

    assert_eq!(data, Some(vec![0x42]));
    let register_writes = pipe
        .written()
        .iter()
        .filter(|r| r.first() == Some(&0x02))
        .count();
    assert_eq!(register_writes, 4);
    assert_eq!(dongle.last_ack().map(|a| a.forced), Some(true));
    assert!(logs_contain("acknowledgment failed after 4 attempts; continuing anyway"));
    Ok(())
}

#[test]
#[traced_test]
fn wrong_report_kind_is_bounded() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    for _ in 0..6 {
        pipe.queue_report([0x03, 0x00]);
    }

    let err = dongle.transact(0x48, &[0x00], 0, 0).err();

    assert!(matches!(
        err,
        Some(DongleError::ProtocolDesync {
            adapter: AdapterKind::Iow,
            ..
        })
    ));
    // mode report plus the original write and five re-sends
    assert_eq!(pipe.written().len(), 7);
    assert!(logs_contain("unexpected IOW report kind"));
    Ok(())
}

#[test]
fn desync_then_ack_recovers() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    pipe.queue_report([0x03, 0x02, 0xFF, 0xFF]);
    pipe.queue_ack(false);

    dongle.transact(0x48, &[0x01, 0x00], 0, 0)?;

    assert_eq!(dongle.last_ack().map(|a| a.desyncs), Some(1));
    Ok(())
}

// ---------------------------------------------------------------------------
// Read phase
// ---------------------------------------------------------------------------

#[test]
fn read_spans_several_reports() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    pipe.queue_ack(false);
    pipe.queue_read(&[1, 2, 3, 4, 5, 6]);
    pipe.queue_read(&[7, 8, 9, 10]);

    let data = dongle.transact(0x50, &[0x00, 0x00], 10, 0)?;

    assert_eq!(data, Some((1..=10).collect::<Vec<u8>>()));
    Ok(())
}

#[test]
#[traced_test]
fn stray_and_failed_read_reports_are_discarded() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    pipe.queue_ack(false);
    pipe.queue_report([0x02, 0x00]);
    pipe.queue_report([0x03, 0x80, 0xEE, 0xEE]);
    pipe.queue_read(&[0x1A, 0x80]);

    let data = dongle.transact(0x48, &[0x00], 2, 0)?;

    assert_eq!(data, Some(vec![0x1A, 0x80]));
    assert!(logs_contain("discarding unexpected IOW report"));
    assert!(logs_contain("error bit set"));
    Ok(())
}

#[test]
fn discarded_reports_are_bounded() -> Result<(), DongleError> {
    let settings = IowSettings {
        stray_report_limit: 2,
        ..quick_settings()
    };
    let (pipe, mut dongle) = open_with(MockHidPipe::iow24(), settings)?;
    pipe.queue_ack(false);
    for _ in 0..3 {
        pipe.queue_report([0x02, 0x00]);
    }
    pipe.queue_read(&[0x1A, 0x80]);

    let err = dongle.transact(0x48, &[0x00], 2, 0).err();

    assert!(err.is_some_and(|e| e.is_retryable()));
    assert_eq!(pipe.queued(), 1);
    Ok(())
}

#[test]
fn read_timeout_is_a_short_response() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    pipe.queue_ack(false);
    pipe.queue_read(&[1, 2, 3, 4, 5, 6]);

    let err = dongle.transact(0x50, &[0x00], 8, 0).err();

    assert!(matches!(
        err,
        Some(DongleError::ShortResponse {
            adapter: AdapterKind::Iow,
            expected: 8,
            received: 6,
        })
    ));
    Ok(())
}

#[test]
fn oversized_read_is_rejected_before_io() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    let err = dongle.transact(0x50, &[0x00], 256, 0).err();
    assert!(matches!(err, Some(DongleError::InvalidTransaction(_))));
    assert_eq!(pipe.written().len(), 1);
    Ok(())
}

// ---------------------------------------------------------------------------
// Sensibus
// ---------------------------------------------------------------------------

#[test]
fn sensibus_read_carries_the_command_in_the_setup() -> Result<(), DongleError> {
    let settings = IowSettings {
        sensibus: true,
        ..quick_settings()
    };
    let (pipe, mut dongle) = open_with(MockHidPipe::iow24(), settings)?;
    pipe.queue_read(&[0x17, 0x4C, 0x91]);

    // SHT75 temperature measurement
    let data = dongle.transact(0, &[0x03], 3, 0)?;

    assert_eq!(data, Some(vec![0x17, 0x4C, 0x91]));
    let written = pipe.written();
    assert_eq!(written.len(), 2);
    assert_eq!(written.get(1), Some(&short(&[0x03, 0x03, 0x03])));
    assert_eq!(dongle.last_ack(), None);
    Ok(())
}

#[test]
fn sensibus_write_skips_address_and_ack() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;

    // SHT75 soft reset
    assert_eq!(dongle.transact(0, &[0x1E], 0, 0)?, None);

    assert_eq!(pipe.written().get(1), Some(&short(&[0x02, 0xC1, 0x1E])));
    Ok(())
}

// ---------------------------------------------------------------------------
// Lifecycle and info
// ---------------------------------------------------------------------------

#[test]
fn show_info_describes_the_device() -> Result<(), DongleError> {
    let (_pipe, dongle) = open_with(MockHidPipe::iow56(), quick_settings())?;
    let info = dongle.show_info()?;
    assert_eq!(info.name, "IO-Warrior56");
    assert_eq!(info.report_len, 64);
    assert_eq!(info.pipe, pipes::SPECIAL_MODE);
    assert!(info.to_string().contains("0x1503 (IO-Warrior56)"));
    Ok(())
}

#[test]
fn close_is_idempotent() -> Result<(), DongleError> {
    let (pipe, mut dongle) = open_iow24()?;
    dongle.close()?;
    dongle.close()?;
    assert!(pipe.is_closed());
    assert!(!dongle.is_open());
    assert!(matches!(
        dongle.transact(0x48, &[0x00], 2, 0),
        Err(DongleError::Closed(AdapterKind::Iow))
    ));
    assert!(dongle.show_info().is_err());
    Ok(())
}

#[test]
fn drop_releases_the_pipe() -> Result<(), DongleError> {
    let (pipe, dongle) = open_iow24()?;
    drop(dongle);
    assert!(pipe.is_closed());
    Ok(())
}
