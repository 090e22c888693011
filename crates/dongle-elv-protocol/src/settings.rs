//! ELV session configuration.

use crate::protocol::{
    BAUD_RATE, DEFAULT_PORT, DESYNC_DELAY_MS, DESYNC_RETRIES, READ_TIMEOUT_MS, RESET_SETTLE_MS,
};
use i2cdongles_core::DEFAULT_DRAIN_LIMIT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElvSettings {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub drain_limit: usize,
    pub reset_settle_ms: u64,
    /// Read requests re-sent after an unparsable reply.
    pub desync_retries: u8,
    pub desync_delay_ms: u64,
}

impl Default for ElvSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: BAUD_RATE,
            timeout_ms: READ_TIMEOUT_MS,
            drain_limit: DEFAULT_DRAIN_LIMIT,
            reset_settle_ms: RESET_SETTLE_MS,
            desync_retries: DESYNC_RETRIES,
            desync_delay_ms: DESYNC_DELAY_MS,
        }
    }
}

impl ElvSettings {
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }

    pub fn desync_delay(&self) -> Duration {
        Duration::from_millis(self.desync_delay_ms)
    }
}
