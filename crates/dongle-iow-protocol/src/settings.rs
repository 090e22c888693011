//! IO-Warrior session configuration.

use crate::ack::AckPolicy;
use crate::report::ModeFlags;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IowSettings {
    /// Restrict discovery to one product id; first IO-Warrior found otherwise.
    pub product_id: Option<u16>,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// IOW24 only, for 3.3 V buses.
    pub disable_pullups: bool,
    /// Sensibus protocol for SHT7x sensors.
    pub sensibus: bool,
    /// Write re-sends after a NACK before it is ignored.
    pub ack_retries: u8,
    pub desync_retries: u8,
    pub desync_delay_ms: u64,
    /// Wrong-kind or failed read reports tolerated per transaction.
    pub stray_report_limit: usize,
}

impl Default for IowSettings {
    fn default() -> Self {
        let policy = AckPolicy::default();
        Self {
            product_id: None,
            read_timeout_ms: 500,
            write_timeout_ms: 500,
            disable_pullups: false,
            sensibus: false,
            ack_retries: policy.max_nack_retries,
            desync_retries: policy.max_desync_retries,
            desync_delay_ms: 50,
            stray_report_limit: 16,
        }
    }
}

impl IowSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn ack_policy(&self) -> AckPolicy {
        AckPolicy {
            max_nack_retries: self.ack_retries,
            max_desync_retries: self.desync_retries,
            desync_delay: Duration::from_millis(self.desync_delay_ms),
        }
    }

    pub fn mode_flags(&self) -> ModeFlags {
        ModeFlags {
            disable_pullups: self.disable_pullups,
            sensibus: self.sensibus,
        }
    }
}
