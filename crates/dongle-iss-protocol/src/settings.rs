//! USB-ISS session configuration.

use crate::protocol::{BAUD_RATE, DEFAULT_PORT, I2cMode, READ_TIMEOUT_MS};
use i2cdongles_core::DEFAULT_DRAIN_LIMIT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssSettings {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub drain_limit: usize,
    pub mode: I2cMode,
}

impl Default for IssSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: BAUD_RATE,
            timeout_ms: READ_TIMEOUT_MS,
            drain_limit: DEFAULT_DRAIN_LIMIT,
            mode: I2cMode::default(),
        }
    }
}

impl IssSettings {
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
