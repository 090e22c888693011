//! Adapter registry behavior over mock transports.

use i2cdongles_core::mock::MockSerialLink;
use i2cdongles_core::{AdapterKind, DongleError, I2cAdapter};
use i2cdongles_elv::ElvSettings;
use i2cdongles_hub::{
    AdapterConfig, Dongle, DongleContext, DongleInfo, HubConfig, HubError, HubResult,
};
use i2cdongles_iow::IowSettings;
use i2cdongles_iow::mock::MockHidPipe;
use i2cdongles_iss::IssSettings;
use std::io::Write;
use tracing_test::traced_test;

const ELV_IDENTITY: &str = "ELV USB-I2C-Interface v1.7 (c) ELV 2010\r\n";

fn elv(link: &MockSerialLink) -> HubResult<Dongle> {
    link.reply_with(ELV_IDENTITY);
    Dongle::elv_with_link(link.clone(), ElvSettings::default())
}

fn iss(link: &MockSerialLink) -> HubResult<Dongle> {
    link.reply_with([0x07, 0x09, 0x40]);
    link.reply_with([0xFF, 0x00]);
    Dongle::iss_with_link(link.clone(), IssSettings::default())
}

fn iow(pipe: &MockHidPipe) -> HubResult<Dongle> {
    Dongle::iow_with_pipe(pipe.clone(), IowSettings::default())
}

#[test]
fn handles_route_transactions_to_their_adapter() -> HubResult<()> {
    let elv_link = MockSerialLink::new();
    let iss_link = MockSerialLink::new();
    let pipe = MockHidPipe::iow24();

    let mut context = DongleContext::new();
    let mut bench = context.insert("bench", elv(&elv_link)?)?;
    let mut lab = context.insert("lab", iss(&iss_link)?)?;
    let mut sht = context.insert("sht", iow(&pipe)?)?;
    assert_eq!(context.names().collect::<Vec<_>>(), vec!["bench", "lab", "sht"]);

    elv_link.reply_silently();
    elv_link.reply_with("1A 80 \r\n");
    assert_eq!(bench.transact(0x48, &[0x00], 2, 0)?, Some(vec![0x1A, 0x80]));

    iss_link.reply_silently();
    iss_link.reply_with([0x1B, 0x00]);
    assert_eq!(lab.transact(0x48, &[0x00], 2, 0)?, Some(vec![0x1B, 0x00]));

    pipe.queue_ack(false);
    pipe.queue_read(&[0x1C, 0x00]);
    assert_eq!(sht.transact(0x48, &[0x00], 2, 0)?, Some(vec![0x1C, 0x00]));

    assert_eq!(bench.kind(), AdapterKind::Elv);
    assert_eq!(lab.name(), "lab");
    assert_eq!(sht.kind(), AdapterKind::Iow);
    Ok(())
}

#[test]
fn concurrent_drivers_share_one_adapter() -> HubResult<()> {
    let link = MockSerialLink::new();
    let mut context = DongleContext::new();
    let handle = context.insert("bench", elv(&link)?)?;

    let results: Vec<_> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0u8..4)
            .map(|register| {
                let mut driver = handle.clone();
                scope.spawn(move || driver.transact(0x48, &[register, 0x00], 0, 0))
            })
            .collect();
        workers.into_iter().map(|worker| worker.join()).collect()
    });
    assert!(results.iter().all(|r| matches!(r, Ok(Ok(None)))));

    let writes = link.written_text();
    assert_eq!(writes.len(), 5);
    // every frame is complete: no interleaving
    assert!(writes.iter().skip(1).all(|w| w.starts_with("S 90 0") && w.ends_with(" 00 P")));
    Ok(())
}

#[test]
fn duplicate_names_are_rejected() -> HubResult<()> {
    let mut context = DongleContext::new();
    context.insert("x", iow(&MockHidPipe::iow24())?)?;
    let err = context.insert("x", iow(&MockHidPipe::iow24())?).err();
    assert!(matches!(err, Some(HubError::DuplicateName(name)) if name == "x"));
    assert_eq!(context.len(), 1);
    Ok(())
}

#[test]
#[traced_test]
fn close_all_is_idempotent_and_reaches_every_handle() -> HubResult<()> {
    let link = MockSerialLink::new();
    let pipe = MockHidPipe::iow24();
    let mut context = DongleContext::new();
    let mut bench = context.insert("bench", elv(&link)?)?;
    context.insert("sht", iow(&pipe)?)?;

    context.close_all()?;
    context.close_all()?;

    assert!(link.is_closed());
    assert!(pipe.is_closed());
    assert!(!bench.is_open());
    assert!(matches!(
        bench.transact(0x48, &[], 1, 0),
        Err(DongleError::Closed(AdapterKind::Elv))
    ));
    assert!(logs_contain("adapters closed"));
    Ok(())
}

#[test]
fn dropping_the_context_closes_adapters() -> HubResult<()> {
    let pipe = MockHidPipe::iow24();
    {
        let mut context = DongleContext::new();
        context.insert("sht", iow(&pipe)?)?;
    }
    assert!(pipe.is_closed());
    Ok(())
}

#[test]
fn admin_operations_dispatch_by_kind() -> HubResult<()> {
    let elv_link = MockSerialLink::new();
    let mut context = DongleContext::new();
    let bench = context.insert("bench", elv(&elv_link)?)?;
    let sht = context.insert("sht", iow(&MockHidPipe::iow56())?)?;

    let info = sht.with(Dongle::show_info)?;
    assert!(matches!(&info, DongleInfo::Iow(i) if i.name == "IO-Warrior56"));

    let err = sht.with(Dongle::reset).err();
    assert!(matches!(
        err,
        Some(DongleError::Unsupported {
            adapter: AdapterKind::Iow,
            ..
        })
    ));
    assert!(sht.with(Dongle::show_macro).is_err());

    elv_link.reply_with("ELV USB-I2C status\r\n");
    let info = bench.with(Dongle::show_info)?;
    assert!(info.to_string().starts_with("ELV USB-I2C status"));
    Ok(())
}

#[test]
fn missing_adapter_is_reported_by_name() {
    let config = HubConfig::default();
    let err = DongleContext::open_named(&config, "bench").err();
    assert!(matches!(err, Some(HubError::AdapterNotFound(name)) if name == "bench"));
}

#[test]
fn unopenable_serial_port_is_an_initialization_failure() -> HubResult<()> {
    let config = HubConfig::from_yaml_str(
        "adapters:\n  - { name: bench, kind: elv, port: /dev/i2cdongles-missing }\n",
    )?;
    let err = DongleContext::open_all(&config).err();
    assert!(err.is_some_and(|e| e.is_initialization()));
    Ok(())
}

#[cfg(not(feature = "hidapi"))]
#[test]
fn iow_without_backend_is_unavailable() {
    let config = HubConfig {
        adapters: vec![AdapterConfig::default_for(AdapterKind::Iow)],
    };
    let err = DongleContext::open_all(&config).err();
    assert!(matches!(
        err,
        Some(HubError::BackendUnavailable(AdapterKind::Iow))
    ));
}

#[test]
fn config_loads_from_a_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "adapters:")?;
    writeln!(file, "  - name: lab")?;
    writeln!(file, "    kind: iss")?;
    writeln!(file, "    port: /dev/ttyACM3")?;

    let config = HubConfig::from_path(file.path())?;
    assert_eq!(config.find("lab").and_then(AdapterConfig::port), Some("/dev/ttyACM3"));
    assert_eq!(config.first_of(AdapterKind::Iss).map(AdapterConfig::name), Some("lab"));
    Ok(())
}
