//! dongle-probe - inspect USB-to-I2C dongles from the command line
//!
//! Opens one configured (or default) adapter, prints its administrative
//! information or runs a single bus transaction.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod parse;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use i2cdongles_core::AdapterKind;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::parse::{HexPayload, parse_hex_payload, parse_hex_u8};

#[derive(Parser)]
#[command(name = "dongle-probe")]
#[command(about = "Probe ELV, USB-ISS and IO-Warrior USB-to-I2C adapters")]
#[command(version)]
struct Cli {
    /// Adapter configuration file (YAML)
    #[arg(long, global = true, env = "I2CDONGLES_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Which adapter to open.
#[derive(Args, Debug, Clone, Default)]
struct Target {
    /// Adapter name from the configuration file
    #[arg(long, conflicts_with = "kind")]
    adapter: Option<String>,

    /// Adapter kind, using default settings when not configured (elv, iss, iow)
    #[arg(long)]
    kind: Option<AdapterKind>,

    /// Serial device path, overriding the configured one
    #[arg(long)]
    port: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured adapters
    List,

    /// Open an adapter and print its information
    Info {
        #[command(flatten)]
        target: Target,
    },

    /// Run one I2C transaction
    Transact {
        #[command(flatten)]
        target: Target,

        /// 7-bit slave address (hex, e.g. 0x48); 0 selects Sensibus
        #[arg(long, value_parser = parse_hex_u8)]
        addr: u8,

        /// Bytes to write (hex, e.g. "2C 06")
        #[arg(long, value_parser = parse_hex_payload, default_value = "")]
        write: HexPayload,

        /// Number of bytes to read back
        #[arg(long, default_value_t = 0)]
        read: usize,

        /// Sensor execution time before the read phase, in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u32,
    },

    /// Reset the adapter (ELV only)
    Reset {
        #[command(flatten)]
        target: Target,
    },

    /// Dump the adapter's macro memory (ELV only)
    Macro {
        #[command(flatten)]
        target: Target,
    },
}

fn init_tracing(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("dongle_probe={log_level},i2cdongles={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match commands::execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(commands::exit_code(&e))
        }
    }
}
