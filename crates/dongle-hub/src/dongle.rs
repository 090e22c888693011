//! Runtime selection between the three adapter kinds.

use crate::config::AdapterConfig;
use crate::error::HubResult;
use i2cdongles_core::{
    AdapterKind, DongleError, DongleResult, I2cAdapter, I2cTransaction, SerialLink,
    SystemSerialLink,
};
use i2cdongles_elv::{ElvDongle, MacroDump};
use i2cdongles_iow::{HidPipe, IowDongle, IowInfo, IowSettings};
use i2cdongles_iss::{IssDongle, IssInfo};
use std::fmt;
use std::time::Duration;
use tracing::info;

pub type ElvSession = ElvDongle<Box<dyn SerialLink>>;
pub type IssSession = IssDongle<Box<dyn SerialLink>>;
pub type IowSession = IowDongle<Box<dyn HidPipe>>;

/// Any open adapter session.
pub enum Dongle {
    Elv(ElvSession),
    Iss(IssSession),
    Iow(IowSession),
}

/// Administrative details of an open adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DongleInfo {
    /// The ELV's free-form status text.
    Elv(String),
    Iss(IssInfo),
    Iow(IowInfo),
}

impl fmt::Display for DongleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elv(text) => f.write_str(text),
            Self::Iss(info) => write!(f, "{info}"),
            Self::Iow(info) => write!(f, "{info}"),
        }
    }
}

fn open_serial(
    kind: AdapterKind,
    port: &str,
    baud_rate: u32,
    timeout: Duration,
) -> DongleResult<Box<dyn SerialLink>> {
    let link = SystemSerialLink::open(port, baud_rate, timeout)
        .map_err(|e| DongleError::init(kind, format!("cannot open {port}: {e}")))?;
    Ok(Box::new(link))
}

#[cfg(feature = "hidapi")]
fn open_iow(settings: &IowSettings) -> HubResult<Dongle> {
    let pipe = i2cdongles_iow::HidapiPipe::open(settings.product_id).map_err(|e| {
        DongleError::init(AdapterKind::Iow, format!("cannot open IO-Warrior: {e}"))
    })?;
    Dongle::iow_with_pipe(pipe, settings.clone())
}

#[cfg(not(feature = "hidapi"))]
fn open_iow(_settings: &IowSettings) -> HubResult<Dongle> {
    Err(crate::error::HubError::BackendUnavailable(AdapterKind::Iow))
}

impl Dongle {
    /// Opens the transport described by `config` and runs the handshake.
    pub fn open(config: &AdapterConfig) -> HubResult<Self> {
        let dongle = match config {
            AdapterConfig::Elv { settings, .. } => {
                let link = open_serial(
                    AdapterKind::Elv,
                    &settings.port,
                    settings.baud_rate,
                    settings.timeout(),
                )?;
                Self::Elv(ElvDongle::with_link(link, settings.clone())?)
            }
            AdapterConfig::Iss { settings, .. } => {
                let link = open_serial(
                    AdapterKind::Iss,
                    &settings.port,
                    settings.baud_rate,
                    settings.timeout(),
                )?;
                Self::Iss(IssDongle::with_link(link, settings.clone())?)
            }
            AdapterConfig::Iow { settings, .. } => open_iow(settings)?,
        };
        info!(adapter = config.name(), kind = %dongle.kind(), "adapter ready");
        Ok(dongle)
    }

    pub fn elv_with_link(
        link: impl SerialLink + 'static,
        settings: i2cdongles_elv::ElvSettings,
    ) -> HubResult<Self> {
        let link: Box<dyn SerialLink> = Box::new(link);
        Ok(Self::Elv(ElvDongle::with_link(link, settings)?))
    }

    pub fn iss_with_link(
        link: impl SerialLink + 'static,
        settings: i2cdongles_iss::IssSettings,
    ) -> HubResult<Self> {
        let link: Box<dyn SerialLink> = Box::new(link);
        Ok(Self::Iss(IssDongle::with_link(link, settings)?))
    }

    pub fn iow_with_pipe(pipe: impl HidPipe + 'static, settings: IowSettings) -> HubResult<Self> {
        let pipe: Box<dyn HidPipe> = Box::new(pipe);
        Ok(Self::Iow(IowDongle::with_pipe(pipe, settings)?))
    }

    fn adapter(&self) -> &dyn I2cAdapter {
        match self {
            Self::Elv(d) => d,
            Self::Iss(d) => d,
            Self::Iow(d) => d,
        }
    }

    fn adapter_mut(&mut self) -> &mut dyn I2cAdapter {
        match self {
            Self::Elv(d) => d,
            Self::Iss(d) => d,
            Self::Iow(d) => d,
        }
    }

    pub fn show_info(&mut self) -> DongleResult<DongleInfo> {
        match self {
            Self::Elv(d) => d.show_info().map(DongleInfo::Elv),
            Self::Iss(d) => d.show_info().map(DongleInfo::Iss),
            Self::Iow(d) => d.show_info().map(DongleInfo::Iow),
        }
    }

    /// Restarts the adapter firmware and returns its startup text.
    pub fn reset(&mut self) -> DongleResult<String> {
        match self {
            Self::Elv(d) => d.reset(),
            Self::Iss(d) => d.reset().map(|()| String::new()),
            Self::Iow(_) => Err(DongleError::Unsupported {
                adapter: AdapterKind::Iow,
                operation: "reset",
            }),
        }
    }

    pub fn show_macro(&mut self) -> DongleResult<MacroDump> {
        match self {
            Self::Elv(d) => d.show_macro(),
            other => Err(DongleError::Unsupported {
                adapter: other.kind(),
                operation: "macro dump",
            }),
        }
    }
}

impl I2cAdapter for Dongle {
    fn kind(&self) -> AdapterKind {
        self.adapter().kind()
    }

    fn is_open(&self) -> bool {
        self.adapter().is_open()
    }

    fn execute(&mut self, tx: &I2cTransaction) -> DongleResult<Option<Vec<u8>>> {
        self.adapter_mut().execute(tx)
    }

    fn close(&mut self) -> DongleResult<()> {
        self.adapter_mut().close()
    }
}

impl From<ElvSession> for Dongle {
    fn from(dongle: ElvSession) -> Self {
        Self::Elv(dongle)
    }
}

impl From<IssSession> for Dongle {
    fn from(dongle: IssSession) -> Self {
        Self::Iss(dongle)
    }
}

impl From<IowSession> for Dongle {
    fn from(dongle: IowSession) -> Self {
        Self::Iow(dongle)
    }
}
