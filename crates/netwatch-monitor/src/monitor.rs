//! Monitor — the registry, the prober and the identity store wired together.

use std::sync::Arc;

use tracing::{debug, error, info};

use netwatch_core::ProbeSettings;
use netwatch_probe::ProbeExecutor;
use netwatch_state::{
    AddOutcome, DeviceIdentity, DeviceRegistry, IdentityStore, StateError, StateResult,
    is_valid_address,
};

use crate::scheduler::PollingScheduler;

/// Request to start monitoring a new address.
#[derive(Debug, Clone, Default)]
pub struct AddDeviceRequest {
    pub address: String,
    pub name: Option<String>,
    pub group: Option<String>,
    pub short_label: Option<String>,
}

impl AddDeviceRequest {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(
            &self.address,
            self.name.as_deref(),
            self.group.as_deref(),
            self.short_label.as_deref(),
        )
    }
}

/// Shared handle over the device registry and the components that feed it.
#[derive(Clone)]
pub struct Monitor {
    registry: DeviceRegistry,
    executor: Arc<dyn ProbeExecutor>,
    identities: IdentityStore,
}

impl Monitor {
    pub fn new(
        registry: DeviceRegistry,
        executor: Arc<dyn ProbeExecutor>,
        identities: IdentityStore,
    ) -> Self {
        Self {
            registry,
            executor,
            identities,
        }
    }

    /// Normalise and load the identity store into the registry.
    ///
    /// Runs once at startup; any I/O failure is returned to the caller.
    pub async fn load_identities(&self) -> StateResult<usize> {
        self.identities.normalize()?;
        let identities = self.identities.load()?;
        Ok(self.registry.load(identities).await)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn identity_store(&self) -> &IdentityStore {
        &self.identities
    }

    /// Build the polling scheduler for this monitor.
    pub fn scheduler(&self, settings: &ProbeSettings) -> PollingScheduler {
        PollingScheduler::new(
            self.registry.clone(),
            self.executor.clone(),
            settings.interval,
            settings.concurrency,
        )
    }

    /// Register a new address with an immediate probe.
    ///
    /// Already-registered addresses are left untouched, metadata included.
    /// A new device gets a real first status, one transition record, and a
    /// line in the identity store.
    pub async fn add_device(&self, request: AddDeviceRequest) -> StateResult<AddOutcome> {
        let identity = request.identity();
        if !is_valid_address(&identity.address) {
            return Err(StateError::InvalidAddress(request.address));
        }
        if self.registry.contains(&identity.address).await {
            debug!(address = %identity.address, "add ignored, device already registered");
            return Ok(AddOutcome::AlreadyRegistered);
        }

        let outcome = self.executor.execute(&identity.address).await;
        let address = identity.address.clone();
        let store = &self.identities;
        let result = self
            .registry
            .register(identity, outcome, |id| store.append(id))
            .await;

        match &result {
            Ok(AddOutcome::Added(state)) => {
                info!(%address, status = %state.status, "device registered and persisted");
            }
            Ok(AddOutcome::AlreadyRegistered) => {
                debug!(%address, "add lost race with concurrent registration");
            }
            Err(e) => {
                error!(%address, error = %e, "device registration failed");
            }
        }
        result
    }
}
