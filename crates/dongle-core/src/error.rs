//! Error taxonomy shared by every adapter.

use crate::transaction::AdapterKind;
use thiserror::Error;

/// Errors raised at the adapter boundary.
///
/// [`DongleError::Initialization`] is fatal: a session whose handshake failed
/// cannot be used. Acknowledgment failures are normally absorbed by the HID
/// adapter's retry policy and only surface in logs.
#[derive(Error, Debug)]
pub enum DongleError {
    #[error("{adapter} initialization failed: {reason}")]
    Initialization { adapter: AdapterKind, reason: String },

    #[error("{adapter} transport error: {source}")]
    Transport {
        adapter: AdapterKind,
        #[source]
        source: std::io::Error,
    },

    #[error("{adapter} returned {received} of {expected} expected bytes")]
    ShortResponse {
        adapter: AdapterKind,
        expected: usize,
        received: usize,
    },

    #[error("{adapter} protocol desync: {detail}")]
    ProtocolDesync { adapter: AdapterKind, detail: String },

    #[error("{adapter} acknowledgment failed after {attempts} attempts")]
    Acknowledgment { adapter: AdapterKind, attempts: u8 },

    #[error("{adapter} reported: {text}")]
    DeviceMessage { adapter: AdapterKind, text: String },

    #[error("slave address 0x{0:02X} is outside the 7-bit range")]
    InvalidAddress(u8),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("{adapter} does not support {operation}")]
    Unsupported {
        adapter: AdapterKind,
        operation: &'static str,
    },

    #[error("{0} session is closed")]
    Closed(AdapterKind),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DongleError {
    pub fn init(adapter: AdapterKind, reason: impl Into<String>) -> Self {
        Self::Initialization {
            adapter,
            reason: reason.into(),
        }
    }

    pub fn transport(adapter: AdapterKind, source: std::io::Error) -> Self {
        Self::Transport { adapter, source }
    }

    pub fn desync(adapter: AdapterKind, detail: impl Into<String>) -> Self {
        Self::ProtocolDesync {
            adapter,
            detail: detail.into(),
        }
    }

    /// The session cannot be used after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Initialization { .. })
    }

    /// Re-issuing the same transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProtocolDesync { .. } | Self::ShortResponse { .. } | Self::Acknowledgment { .. }
        )
    }

    /// The underlying serial port or HID handle failed or is gone.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Io(_) | Self::ShortResponse { .. } | Self::Closed(_)
        )
    }

    /// Adapter that raised the error, when one is known.
    pub fn adapter(&self) -> Option<AdapterKind> {
        match self {
            Self::Initialization { adapter, .. }
            | Self::Transport { adapter, .. }
            | Self::ShortResponse { adapter, .. }
            | Self::ProtocolDesync { adapter, .. }
            | Self::Acknowledgment { adapter, .. }
            | Self::DeviceMessage { adapter, .. }
            | Self::Unsupported { adapter, .. } => Some(*adapter),
            Self::Closed(adapter) => Some(*adapter),
            Self::InvalidAddress(_) | Self::InvalidTransaction(_) | Self::Io(_) => None,
        }
    }
}

pub type DongleResult<T> = Result<T, DongleError>;
