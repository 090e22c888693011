//! Adapter registry for USB-to-I2C dongles.
//!
//! [`HubConfig`] describes the adapters a process may use; [`DongleContext`]
//! opens them and hands out [`AdapterHandle`]s that sensor drivers hold for
//! the lifetime of the session.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod context;
pub mod dongle;
pub mod error;

pub use config::{
    AdapterConfig, ELV_PORT_ENV, HubConfig, IOW_DISABLE_PULLUPS_ENV, IOW_SENSIBUS_ENV,
    ISS_PORT_ENV,
};
pub use context::{AdapterHandle, DongleContext};
pub use dongle::{Dongle, DongleInfo, ElvSession, IowSession, IssSession};
pub use error::{HubError, HubResult};
