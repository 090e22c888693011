//! YAML adapter configuration with environment overrides.
//!
//! ```yaml
//! adapters:
//!   - name: bench
//!     kind: elv
//!     port: /dev/ttyUSB1
//!   - name: sht75
//!     kind: iow
//!     sensibus: true
//! ```

use crate::error::{HubError, HubResult};
use i2cdongles_core::AdapterKind;
use i2cdongles_elv::ElvSettings;
use i2cdongles_iow::IowSettings;
use i2cdongles_iss::IssSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

pub const ELV_PORT_ENV: &str = "I2CDONGLES_ELV_PORT";
pub const ISS_PORT_ENV: &str = "I2CDONGLES_ISS_PORT";
pub const IOW_DISABLE_PULLUPS_ENV: &str = "I2CDONGLES_IOW_DISABLE_PULLUPS";
pub const IOW_SENSIBUS_ENV: &str = "I2CDONGLES_IOW_SENSIBUS";

fn parse_bool_env(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enable" | "enabled"
    )
}

/// One named adapter and its settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AdapterConfig {
    Elv {
        name: String,
        #[serde(flatten)]
        settings: ElvSettings,
    },
    Iss {
        name: String,
        #[serde(flatten)]
        settings: IssSettings,
    },
    Iow {
        name: String,
        #[serde(flatten)]
        settings: IowSettings,
    },
}

impl AdapterConfig {
    /// Default settings for `kind`, named after it.
    pub fn default_for(kind: AdapterKind) -> Self {
        let name = kind.to_string().to_ascii_lowercase();
        match kind {
            AdapterKind::Elv => Self::Elv {
                name,
                settings: ElvSettings::default(),
            },
            AdapterKind::Iss => Self::Iss {
                name,
                settings: IssSettings::default(),
            },
            AdapterKind::Iow => Self::Iow {
                name,
                settings: IowSettings::default(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Elv { name, .. } | Self::Iss { name, .. } | Self::Iow { name, .. } => name,
        }
    }

    pub fn kind(&self) -> AdapterKind {
        match self {
            Self::Elv { .. } => AdapterKind::Elv,
            Self::Iss { .. } => AdapterKind::Iss,
            Self::Iow { .. } => AdapterKind::Iow,
        }
    }

    /// Serial device path, for the serial adapters.
    pub fn port(&self) -> Option<&str> {
        match self {
            Self::Elv { settings, .. } => Some(&settings.port),
            Self::Iss { settings, .. } => Some(&settings.port),
            Self::Iow { .. } => None,
        }
    }

    /// Replaces the serial device path; ignored for the IO-Warrior.
    pub fn set_port(&mut self, port: &str) {
        match self {
            Self::Elv { settings, .. } => settings.port = port.to_string(),
            Self::Iss { settings, .. } => settings.port = port.to_string(),
            Self::Iow { .. } => {}
        }
    }
}

/// Keys accepted for an adapter of `kind`: `name`, `kind` and its settings.
fn known_keys(kind: AdapterKind) -> HubResult<BTreeSet<String>> {
    let defaults = serde_yaml::to_value(AdapterConfig::default_for(kind))?;
    Ok(defaults
        .as_mapping()
        .map(|mapping| {
            mapping
                .keys()
                .filter_map(serde_yaml::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

fn reject_unknown_keys(raw: &serde_yaml::Value) -> HubResult<()> {
    let Some(adapters) = raw.get("adapters").and_then(serde_yaml::Value::as_sequence) else {
        return Ok(());
    };
    for adapter in adapters {
        let Some(mapping) = adapter.as_mapping() else {
            continue;
        };
        // unknown or missing kinds are reported by the typed parse
        let Some(kind) = adapter
            .get("kind")
            .and_then(serde_yaml::Value::as_str)
            .and_then(|kind| kind.parse::<AdapterKind>().ok())
        else {
            continue;
        };
        let known = known_keys(kind)?;
        for key in mapping.keys() {
            let key = key.as_str().unwrap_or_default();
            if !known.contains(key) {
                let name = adapter
                    .get("name")
                    .and_then(serde_yaml::Value::as_str)
                    .unwrap_or("?");
                return Err(HubError::InvalidConfiguration(format!(
                    "unknown key '{key}' for {kind} adapter '{name}'"
                )));
            }
        }
    }
    Ok(())
}

/// Every adapter the process may open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
}

impl HubConfig {
    /// Parses and validates a configuration. Adapter keys that no setting
    /// recognises are rejected, so a misspelt option cannot pass silently.
    pub fn from_yaml_str(yaml: &str) -> HubResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        reject_unknown_keys(&raw)?;
        let config: Self = serde_yaml::from_value(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> HubResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading adapter configuration");
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> HubResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Names must be non-empty and unique.
    pub fn validate(&self) -> HubResult<()> {
        let mut seen = BTreeSet::new();
        for adapter in &self.adapters {
            let name = adapter.name();
            if name.trim().is_empty() {
                return Err(HubError::InvalidConfiguration(format!(
                    "{} adapter has an empty name",
                    adapter.kind()
                )));
            }
            if !seen.insert(name) {
                return Err(HubError::DuplicateName(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&AdapterConfig> {
        self.adapters.iter().find(|a| a.name() == name)
    }

    /// First adapter of `kind`.
    pub fn first_of(&self, kind: AdapterKind) -> Option<&AdapterConfig> {
        self.adapters.iter().find(|a| a.kind() == kind)
    }

    /// Applies the `I2CDONGLES_*` process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, keyed like the environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let elv_port = lookup(ELV_PORT_ENV).filter(|v| !v.trim().is_empty());
        let iss_port = lookup(ISS_PORT_ENV).filter(|v| !v.trim().is_empty());
        let pullups = lookup(IOW_DISABLE_PULLUPS_ENV).map(|v| parse_bool_env(&v));
        let sensibus = lookup(IOW_SENSIBUS_ENV).map(|v| parse_bool_env(&v));

        for adapter in &mut self.adapters {
            match adapter {
                AdapterConfig::Elv { name, settings } => {
                    if let Some(port) = &elv_port {
                        debug!(adapter = %name, port = %port, "ELV port overridden");
                        settings.port = port.trim().to_string();
                    }
                }
                AdapterConfig::Iss { name, settings } => {
                    if let Some(port) = &iss_port {
                        debug!(adapter = %name, port = %port, "ISS port overridden");
                        settings.port = port.trim().to_string();
                    }
                }
                AdapterConfig::Iow { settings, .. } => {
                    if let Some(disable) = pullups {
                        settings.disable_pullups = disable;
                    }
                    if let Some(enable) = sensibus {
                        settings.sensibus = enable;
                    }
                }
            }
        }
    }
}
