//! Subcommand implementations.

use anyhow::{Context, Result};
use i2cdongles_core::{DongleError, HexBytes, I2cAdapter};
use i2cdongles_hub::{AdapterConfig, AdapterHandle, Dongle, DongleContext, HubConfig, HubError};
use tracing::{debug, info};

use crate::{Cli, Commands, Target};

/// Exit status for a failed run: 2 when the adapter is unknown, 3 when it
/// could not be brought up, 1 for everything else.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    if let Some(hub) = error.downcast_ref::<HubError>() {
        return match hub {
            HubError::AdapterNotFound(_) => 2,
            HubError::BackendUnavailable(_) => 3,
            e if e.is_initialization() => 3,
            _ => 1,
        };
    }
    match error.downcast_ref::<DongleError>() {
        Some(e) if e.is_fatal() => 3,
        _ => 1,
    }
}

pub fn execute(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    match &cli.command {
        Commands::List => list(&config),
        Commands::Info { target } => {
            let (_context, handle) = open(&config, target)?;
            let info = handle.with(Dongle::show_info)?;
            println!("{info}");
            Ok(())
        }
        Commands::Transact {
            target,
            addr,
            write,
            read,
            delay_ms,
        } => {
            let (_context, mut handle) = open(&config, target)?;
            let data = handle.transact(*addr, &write.0, *read, *delay_ms)?;
            match data {
                Some(bytes) => println!("{}", HexBytes(&bytes)),
                None => println!("ok"),
            }
            Ok(())
        }
        Commands::Reset { target } => {
            let (_context, handle) = open(&config, target)?;
            let text = handle.with(Dongle::reset)?;
            if !text.is_empty() {
                println!("{}", text.trim_end());
            }
            Ok(())
        }
        Commands::Macro { target } => {
            let (_context, handle) = open(&config, target)?;
            let dump = handle.with(Dongle::show_macro)?;
            println!("{dump}");
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<HubConfig> {
    let mut config = match &cli.config {
        Some(path) => HubConfig::from_path(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => HubConfig::default(),
    };
    config.apply_env_overrides();
    debug!(adapters = config.adapters.len(), "configuration loaded");
    Ok(config)
}

fn list(config: &HubConfig) -> Result<()> {
    if config.adapters.is_empty() {
        println!("No adapters configured");
        return Ok(());
    }
    for adapter in &config.adapters {
        match adapter.port() {
            Some(port) => println!("{:<16} {:<4} {port}", adapter.name(), adapter.kind()),
            None => println!("{:<16} {:<4} (usb)", adapter.name(), adapter.kind()),
        }
    }
    Ok(())
}

/// Picks the adapter settings for `target`: by name, by kind (falling back to
/// defaults), or the first configured one.
fn resolve(config: &HubConfig, target: &Target) -> Result<AdapterConfig, HubError> {
    let mut adapter = if let Some(name) = &target.adapter {
        config
            .find(name)
            .cloned()
            .ok_or_else(|| HubError::AdapterNotFound(name.clone()))?
    } else if let Some(kind) = target.kind {
        config
            .first_of(kind)
            .cloned()
            .unwrap_or_else(|| AdapterConfig::default_for(kind))
    } else {
        config
            .adapters
            .first()
            .cloned()
            .ok_or_else(|| HubError::AdapterNotFound("(none configured)".to_string()))?
    };
    if let Some(port) = &target.port {
        adapter.set_port(port);
    }
    Ok(adapter)
}

fn open(config: &HubConfig, target: &Target) -> Result<(DongleContext, AdapterHandle)> {
    let adapter = resolve(config, target)?;
    info!(adapter = adapter.name(), kind = %adapter.kind(), "opening adapter");
    let dongle = Dongle::open(&adapter)?;
    let mut context = DongleContext::new();
    let handle = context.insert(adapter.name(), dongle)?;
    Ok((context, handle))
}
