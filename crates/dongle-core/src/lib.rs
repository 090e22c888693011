//! Adapter-independent I2C transaction contract for USB-to-I2C dongles.
//!
//! Sensor drivers describe a bus transaction once ("write these bytes to
//! slave address A, then read N bytes back") and hand it to whichever
//! [`I2cAdapter`] is attached. Each adapter crate translates the transaction
//! into its own wire protocol.
//!
//! This crate also owns the pieces every serial adapter shares: the
//! [`SerialLink`] transport boundary, the bounded-drain [`ResponseBuffer`]
//! and the [`DongleError`] taxonomy.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod address;
pub mod buffer;
pub mod error;
pub mod hex;
pub mod link;
pub mod mock;
pub mod transaction;

pub use address::SlaveAddress;
pub use buffer::{DEFAULT_DRAIN_LIMIT, ResponseBuffer};
pub use error::{DongleError, DongleResult};
pub use hex::HexBytes;
pub use link::SerialLink;
#[cfg(feature = "serial")]
pub use link::SystemSerialLink;
pub use transaction::{AdapterKind, I2cAdapter, I2cTransaction, MIN_SENSOR_WAIT_MS};
