//! Explicit ownership of the open adapters.

use crate::config::HubConfig;
use crate::dongle::Dongle;
use crate::error::{HubError, HubResult};
use i2cdongles_core::{AdapterKind, DongleResult, I2cAdapter, I2cTransaction};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared access to one adapter.
///
/// Sensor drivers keep a clone; the lock is held for a whole transaction, so
/// transactions from different drivers never interleave on the bus.
#[derive(Clone)]
pub struct AdapterHandle {
    name: Arc<str>,
    kind: AdapterKind,
    dongle: Arc<Mutex<Dongle>>,
}

impl AdapterHandle {
    fn new(name: &str, dongle: Dongle) -> Self {
        Self {
            name: Arc::from(name),
            kind: dongle.kind(),
            dongle: Arc::new(Mutex::new(dongle)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `f` with exclusive access, for adapter-specific operations.
    pub fn with<R>(&self, f: impl FnOnce(&mut Dongle) -> R) -> R {
        f(&mut self.dongle.lock())
    }
}

impl std::fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl I2cAdapter for AdapterHandle {
    fn kind(&self) -> AdapterKind {
        self.kind
    }

    fn is_open(&self) -> bool {
        self.dongle.lock().is_open()
    }

    fn execute(&mut self, tx: &I2cTransaction) -> DongleResult<Option<Vec<u8>>> {
        self.dongle.lock().execute(tx)
    }

    fn close(&mut self) -> DongleResult<()> {
        self.dongle.lock().close()
    }
}

/// Named adapters opened by this process.
///
/// Dropping the context closes every adapter, even while drivers still hold
/// handles; their later transactions fail with `Closed`.
#[derive(Debug, Default)]
pub struct DongleContext {
    adapters: BTreeMap<String, AdapterHandle>,
}

impl DongleContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens every configured adapter. Adapters opened before a failure are
    /// closed again.
    pub fn open_all(config: &HubConfig) -> HubResult<Self> {
        config.validate()?;
        let mut context = Self::new();
        for adapter in &config.adapters {
            let dongle = Dongle::open(adapter)?;
            context.insert(adapter.name(), dongle)?;
        }
        Ok(context)
    }

    /// Opens the single adapter called `name`.
    pub fn open_named(config: &HubConfig, name: &str) -> HubResult<Self> {
        let adapter = config
            .find(name)
            .ok_or_else(|| HubError::AdapterNotFound(name.to_string()))?;
        let mut context = Self::new();
        context.insert(adapter.name(), Dongle::open(adapter)?)?;
        Ok(context)
    }

    pub fn insert(&mut self, name: &str, dongle: Dongle) -> HubResult<AdapterHandle> {
        if self.adapters.contains_key(name) {
            return Err(HubError::DuplicateName(name.to_string()));
        }
        let handle = AdapterHandle::new(name, dongle);
        self.adapters.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<AdapterHandle> {
        self.adapters.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> HubResult<AdapterHandle> {
        self.get(name)
            .ok_or_else(|| HubError::AdapterNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Closes every adapter; repeated calls are no-ops. Returns the first
    /// failure after attempting all of them.
    pub fn close_all(&mut self) -> HubResult<()> {
        let mut first_error = None;
        let mut closed = 0usize;
        for (name, handle) in &mut self.adapters {
            if !handle.is_open() {
                continue;
            }
            match handle.close() {
                Ok(()) => closed += 1,
                Err(e) => {
                    warn!(adapter = %name, "close failed: {e}");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if closed > 0 {
            info!(closed, "adapters closed");
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl Drop for DongleContext {
    fn drop(&mut self) {
        if let Err(e) = self.close_all() {
            warn!("failed to close adapters: {e}");
        }
    }
}
