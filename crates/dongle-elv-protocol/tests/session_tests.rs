//! ELV sessions driven over a scripted serial link.

use i2cdongles_core::mock::MockSerialLink;
use i2cdongles_core::{AdapterKind, DongleError, I2cAdapter};
use i2cdongles_elv::{ElvDongle, ElvSettings};
use std::time::{Duration, Instant};
use tracing_test::traced_test;

const IDENTITY: &str = "ELV USB-I2C-Interface v1.7 (c) ELV 2010\r\n";

fn open_session() -> Result<(MockSerialLink, ElvDongle<MockSerialLink>), DongleError> {
    let link = MockSerialLink::new();
    link.reply_with(IDENTITY);
    let dongle = ElvDongle::with_link(link.clone(), ElvSettings::default())?;
    Ok((link, dongle))
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[test]
#[traced_test]
fn handshake_sends_uppercased_init_and_reads_identity() -> Result<(), DongleError> {
    let (link, dongle) = open_session()?;
    assert_eq!(link.written_text(), vec!["<Y30?".to_string()]);
    assert!(dongle.identity().starts_with("ELV USB-I2C"));
    assert!(logs_contain("ELV dongle initialized"));
    Ok(())
}

#[test]
fn handshake_rejects_foreign_identity() {
    let link = MockSerialLink::new();
    link.reply_with("USB-ISS\r\n");

    let result = ElvDongle::with_link(link.clone(), ElvSettings::default());
    let err = result.err();
    assert!(err.as_ref().is_some_and(DongleError::is_fatal));
    assert!(link.is_closed());
}

#[test]
fn handshake_without_reply_is_fatal() {
    let link = MockSerialLink::new();
    let err = ElvDongle::with_link(link, ElvSettings::default()).err();
    assert!(matches!(
        err,
        Some(DongleError::Initialization {
            adapter: AdapterKind::Elv,
            ..
        })
    ));
}

#[test]
fn handshake_on_unplugged_link_is_fatal() {
    let link = MockSerialLink::new();
    link.disconnect();
    let err = ElvDongle::with_link(link, ElvSettings::default()).err();
    assert!(err.is_some_and(|e| e.is_fatal()));
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[test]
fn write_only_transaction_sends_one_frame() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.reply_silently();

    assert_eq!(dongle.transact(0x48, &[0x00], 0, 0)?, None);
    assert_eq!(link.written_text().last().map(String::as_str), Some("S 90 00 P"));
    Ok(())
}

#[test]
fn read_transaction_decodes_hex_reply() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.reply_silently();
    link.reply_with("1A 80 \r\n");

    let data = dongle.transact(0x48, &[0x00], 2, 0)?;

    assert_eq!(data, Some(vec![26, 128]));
    assert_eq!(
        link.written_text(),
        vec!["<Y30?", "S 90 00 P", "S 91 02 P"]
    );
    Ok(())
}

#[test]
#[traced_test]
fn trailing_bytes_are_drained() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.reply_silently();
    link.reply_with("1A 80 \r\n\r\n");

    let data = dongle.transact(0x48, &[0x00], 2, 0)?;

    assert_eq!(data, Some(vec![0x1A, 0x80]));
    assert!(logs_contain("ELV sent bytes beyond the expected response"));
    Ok(())
}

#[test]
fn error_text_is_returned_verbatim() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.reply_silently();
    link.reply_with("Err: NACK\r\n");

    let err = dongle.transact(0x48, &[0x00], 2, 0).err();

    assert!(
        matches!(
            &err,
            Some(DongleError::DeviceMessage {
                adapter: AdapterKind::Elv,
                text,
            }) if text == "Err: NACK"
        ),
        "expected device message, got {err:?}"
    );
    Ok(())
}

#[test]
#[traced_test]
fn garbled_reply_re_sends_the_read_request() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.reply_silently();
    link.reply_with("1A ZZ \r\n");
    link.reply_with("1A 80 \r\n");

    let data = dongle.transact(0x48, &[0x00], 2, 0)?;

    assert_eq!(data, Some(vec![0x1A, 0x80]));
    assert_eq!(
        link.written_text(),
        vec!["<Y30?", "S 90 00 P", "S 91 02 P", "S 91 02 P"]
    );
    assert!(logs_contain("garbled ELV response, re-sending read request"));
    Ok(())
}

#[test]
fn persistent_garble_is_a_desync_after_the_retries() -> Result<(), DongleError> {
    let link = MockSerialLink::new();
    link.reply_with(IDENTITY);
    let settings = ElvSettings {
        desync_retries: 2,
        desync_delay_ms: 1,
        ..ElvSettings::default()
    };
    let mut dongle = ElvDongle::with_link(link.clone(), settings)?;
    link.reply_silently();
    for _ in 0..4 {
        link.reply_with("ZZ \r\n");
    }

    let err = dongle.transact(0x48, &[0x00], 1, 0).err();

    assert!(matches!(
        err,
        Some(DongleError::ProtocolDesync {
            adapter: AdapterKind::Elv,
            ..
        })
    ));
    let read_requests = link
        .written_text()
        .iter()
        .filter(|frame| frame.as_str() == "S 91 01 P")
        .count();
    assert_eq!(read_requests, 3);
    assert_eq!(link.pending_replies(), 1);
    Ok(())
}

#[test]
fn device_errors_are_not_retried() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.reply_silently();
    link.reply_with("Solve bus error\r\n");
    link.reply_with("1A 80 \r\n");

    assert!(matches!(
        dongle.transact(0x48, &[0x00], 2, 0),
        Err(DongleError::DeviceMessage { .. })
    ));
    assert_eq!(link.pending_replies(), 1);
    Ok(())
}

#[test]
fn truncated_reply_is_a_short_response() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.reply_silently();
    link.reply_with("1A \r\n");

    let err = dongle.transact(0x48, &[0x00], 2, 0).err();
    assert!(matches!(
        err,
        Some(DongleError::ShortResponse {
            expected: 2,
            received: 1,
            ..
        })
    ));
    Ok(())
}

#[test]
fn oversized_read_is_rejected_before_io() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    let err = dongle.transact(0x48, &[0x00], 300, 0).err();
    assert!(matches!(err, Some(DongleError::InvalidTransaction(_))));
    assert_eq!(link.written().len(), 1);
    Ok(())
}

#[test]
fn read_waits_for_sensor() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.reply_silently();
    link.reply_with("00 00 00 \r\n");

    let started = Instant::now();
    dongle.transact(0x40, &[0xE3], 3, 25)?;
    assert!(started.elapsed() >= Duration::from_millis(25));
    Ok(())
}

#[test]
fn transport_failure_surfaces_as_transport_error() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.disconnect();
    let err = dongle.transact(0x48, &[0x00], 0, 0).err();
    assert!(err.is_some_and(|e| e.is_transport()));
    Ok(())
}

// ---------------------------------------------------------------------------
// Lifecycle and admin commands
// ---------------------------------------------------------------------------

#[test]
fn close_is_idempotent() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    dongle.close()?;
    dongle.close()?;
    assert!(!dongle.is_open());
    assert!(link.is_closed());
    assert!(matches!(
        dongle.transact(0x48, &[0x00], 0, 0),
        Err(DongleError::Closed(AdapterKind::Elv))
    ));
    Ok(())
}

#[test]
fn drop_closes_link() -> Result<(), DongleError> {
    let (link, dongle) = open_session()?;
    drop(dongle);
    assert!(link.is_closed());
    Ok(())
}

#[test]
fn show_info_returns_trimmed_text() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    link.reply_with("  ELV USB-I2C-Interface v1.7\r\n");

    assert_eq!(dongle.show_info()?, "ELV USB-I2C-Interface v1.7");
    assert_eq!(link.written_text().last().map(String::as_str), Some("?"));
    Ok(())
}

#[test]
fn reset_waits_and_returns_banner() -> Result<(), DongleError> {
    let link = MockSerialLink::new();
    link.reply_with(IDENTITY);
    let settings = ElvSettings {
        reset_settle_ms: 5,
        ..ElvSettings::default()
    };
    let mut dongle = ElvDongle::with_link(link.clone(), settings)?;
    link.reply_with("ELV USB-I2C-Interface v1.7\r\n");

    assert!(dongle.reset()?.starts_with("ELV"));
    assert_eq!(link.written_text().last().map(String::as_str), Some("Z4B"));
    Ok(())
}

#[test]
fn show_macro_splits_lines() -> Result<(), DongleError> {
    let (link, mut dongle) = open_session()?;
    let body = "S".repeat(70);
    link.reply_with(format!("Macro:\r\n{body}\r\n-- end --\r\n"));

    let dump = dongle.show_macro()?;
    assert_eq!(dump.header, "Macro:");
    assert_eq!(dump.rows().len(), 2);
    assert_eq!(dump.footer, "-- end --");
    assert_eq!(link.written_text().last().map(String::as_str), Some("U"));
    Ok(())
}
