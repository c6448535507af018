//! Polling scheduler — periodically probes every registered device.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use netwatch_probe::ProbeExecutor;
use netwatch_state::DeviceRegistry;

/// What one polling cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Devices whose probe completed and was applied.
    pub probed: usize,
    /// Transition records appended during the cycle.
    pub transitions: usize,
    /// Devices whose probe task died before producing a result.
    pub failed: usize,
}

/// Drives the state machine for every device on a fixed interval.
#[derive(Clone)]
pub struct PollingScheduler {
    registry: DeviceRegistry,
    executor: Arc<dyn ProbeExecutor>,
    interval: Duration,
    concurrency: usize,
}

impl PollingScheduler {
    pub fn new(
        registry: DeviceRegistry,
        executor: Arc<dyn ProbeExecutor>,
        interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            registry,
            executor,
            interval,
            concurrency: concurrency.max(1),
        }
    }

    /// Probe every device registered at the start of the cycle once.
    ///
    /// At most `concurrency` bursts are in flight. A probe task that panics
    /// only costs its own device this cycle.
    pub async fn poll_once(&self) -> CycleSummary {
        let addresses = self.registry.addresses().await;
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for address in addresses {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let registry = self.registry.clone();
            let executor = self.executor.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let outcome = executor.execute(&address).await;
                registry.apply(&address, outcome).await.is_some()
            });
        }

        let mut summary = CycleSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(logged) => {
                    summary.probed += 1;
                    if logged {
                        summary.transitions += 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(error = %e, "probe task failed");
                }
            }
        }

        debug!(
            probed = summary.probed,
            transitions = summary.transitions,
            failed = summary.failed,
            "polling cycle complete"
        );
        summary
    }

    /// Run cycles until `shutdown` flips to true or its sender is dropped.
    ///
    /// The first cycle starts immediately; afterwards the scheduler waits
    /// `interval` between the end of one cycle and the start of the next.
    /// A cycle in progress is always finished before stopping.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            concurrency = self.concurrency,
            "polling scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.poll_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    break;
                }
            }
        }

        info!("polling scheduler stopped");
    }
}
