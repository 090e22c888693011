//! Errors raised while loading configuration and managing adapters.

use i2cdongles_core::{AdapterKind, DongleError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Adapter not found: {0}")]
    AdapterNotFound(String),

    #[error("Duplicate adapter name: {0}")]
    DuplicateName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{0} support is not compiled in; rebuild with the `hidapi` feature")]
    BackendUnavailable(AdapterKind),

    #[error(transparent)]
    Dongle(#[from] DongleError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl HubError {
    /// A configured adapter failed its handshake.
    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Dongle(e) if e.is_fatal())
    }
}

pub type HubResult<T> = Result<T, HubError>;
