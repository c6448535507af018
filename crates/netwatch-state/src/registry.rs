//! DeviceRegistry — the authoritative address → state map.
//!
//! Device records and the transition log live behind one `RwLock`. Every
//! tick application and every registration takes the write guard, which
//! makes the four-step state update and its log append a single critical
//! section with respect to readers and to each other.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use netwatch_core::{ProbeOutcome, Timestamp};

use crate::device::{DeviceIdentity, DeviceState, is_valid_address};
use crate::error::{StateError, StateResult};
use crate::log::{TransitionLog, TransitionRecord};

#[derive(Debug, Default)]
struct RegistryInner {
    devices: BTreeMap<String, DeviceState>,
    log: TransitionLog,
}

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// The address was new; carries the freshly seeded state.
    Added(DeviceState),
    /// The address was already registered; nothing changed.
    AlreadyRegistered,
}

/// Thread-safe registry shared by the scheduler and the query surface.
#[derive(Clone, Default)]
pub struct DeviceRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl DeviceRegistry {
    /// Empty registry with an unbounded transition log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry whose transition log keeps at most `cap` records.
    pub fn with_log_cap(cap: Option<usize>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner {
                devices: BTreeMap::new(),
                log: TransitionLog::with_cap(cap),
            })),
        }
    }

    /// Seed placeholder records for identities loaded at startup.
    ///
    /// A later identity with the same address replaces an earlier one.
    pub async fn load(&self, identities: impl IntoIterator<Item = DeviceIdentity>) -> usize {
        let mut inner = self.inner.write().await;
        for identity in identities {
            inner
                .devices
                .insert(identity.address.clone(), DeviceState::placeholder(identity));
        }
        let count = inner.devices.len();
        info!(devices = count, "registry loaded");
        count
    }

    /// Snapshot of the registered addresses, in address order.
    pub async fn addresses(&self) -> Vec<String> {
        self.inner.read().await.devices.keys().cloned().collect()
    }

    pub async fn contains(&self, address: &str) -> bool {
        self.inner.read().await.devices.contains_key(address)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.devices.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.devices.is_empty()
    }

    pub async fn get(&self, address: &str) -> Option<DeviceState> {
        self.inner.read().await.devices.get(address).cloned()
    }

    /// Consistent copy of every device record.
    pub async fn snapshot(&self) -> BTreeMap<String, DeviceState> {
        self.inner.read().await.devices.clone()
    }

    /// Apply a probe outcome to a registered device.
    ///
    /// The tick is timestamped once the write guard is held, so log order
    /// and timestamp order agree. Returns the transition record appended to
    /// the log, if any. Unknown addresses are ignored.
    pub async fn apply(&self, address: &str, outcome: ProbeOutcome) -> Option<TransitionRecord> {
        self.apply_stamped(address, outcome, Local::now).await
    }

    /// Apply a probe outcome with an explicit timestamp.
    pub async fn apply_at(
        &self,
        address: &str,
        outcome: ProbeOutcome,
        now: Timestamp,
    ) -> Option<TransitionRecord> {
        self.apply_stamped(address, outcome, move || now).await
    }

    async fn apply_stamped(
        &self,
        address: &str,
        outcome: ProbeOutcome,
        stamp: impl FnOnce() -> Timestamp,
    ) -> Option<TransitionRecord> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let Some(device) = inner.devices.get_mut(address) else {
            debug!(%address, "probe result for unregistered device dropped");
            return None;
        };

        let record = device.apply(outcome, stamp())?;
        if record.status.is_degraded() {
            warn!(%address, name = %record.name, status = %record.status, "device status changed");
        } else {
            info!(%address, name = %record.name, status = %record.status, "device status changed");
        }
        inner.log.push(record.clone());
        Some(record)
    }

    /// Register a new device seeded from its first probe.
    ///
    /// Under the write guard: if the address is already present nothing
    /// happens; otherwise `persist` is called with the identity and, only if
    /// it succeeds, the device is inserted and its first transition logged,
    /// timestamped at that point.
    pub async fn register<F>(
        &self,
        identity: DeviceIdentity,
        outcome: ProbeOutcome,
        persist: F,
    ) -> StateResult<AddOutcome>
    where
        F: FnOnce(&DeviceIdentity) -> StateResult<()>,
    {
        if !is_valid_address(&identity.address) {
            return Err(StateError::InvalidAddress(identity.address));
        }

        let mut inner = self.inner.write().await;
        if inner.devices.contains_key(&identity.address) {
            debug!(address = %identity.address, "device already registered");
            return Ok(AddOutcome::AlreadyRegistered);
        }

        persist(&identity)?;

        let (state, record) = DeviceState::first_tick(identity, outcome, Local::now());
        info!(
            address = %state.address,
            name = %state.name,
            group = %state.group,
            status = %state.status,
            "device added"
        );
        inner.log.push(record);
        inner.devices.insert(state.address.clone(), state.clone());
        Ok(AddOutcome::Added(state))
    }

    /// The newest `n` transition records, most recent first.
    pub async fn recent_transitions(&self, n: usize) -> Vec<TransitionRecord> {
        self.inner.read().await.log.recent(n)
    }

    /// Every retained transition record, oldest first.
    pub async fn all_transitions(&self) -> Vec<TransitionRecord> {
        self.inner.read().await.log.all()
    }

    pub async fn transition_count(&self) -> usize {
        self.inner.read().await.log.len()
    }
}
