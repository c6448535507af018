//! Probe bursts and their classification.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use netwatch_core::{DeviceStatus, ProbeOutcome, ProbeSettings};

use crate::BoxFuture;
use crate::mechanism::{Probe, probe_for};

/// Produces a classified outcome for one address.
///
/// The monitor only depends on this trait, so tests can substitute a
/// deterministic executor for real network probes.
pub trait ProbeExecutor: Send + Sync {
    fn execute<'a>(&'a self, address: &'a str) -> BoxFuture<'a, ProbeOutcome>;
}

/// Map a success count onto a status.
pub fn classify_successes(successes: u32, loss_threshold: u32) -> DeviceStatus {
    if successes == 0 {
        DeviceStatus::Down
    } else if successes <= loss_threshold {
        DeviceStatus::Loss
    } else {
        DeviceStatus::Up
    }
}

/// Classify a burst from the latencies (ms) of its successful probes.
pub fn classify(latencies_ms: &[f64], loss_threshold: u32) -> ProbeOutcome {
    let status = classify_successes(latencies_ms.len() as u32, loss_threshold);
    let latency_ms = match status {
        DeviceStatus::Down => None,
        _ => {
            let mean = latencies_ms.iter().sum::<f64>() / latencies_ms.len() as f64;
            Some(round_tenths(mean))
        }
    };
    ProbeOutcome { status, latency_ms }
}

fn round_tenths(ms: f64) -> f64 {
    (ms * 10.0).round() / 10.0
}

/// Runs `count` sequential probes per address and classifies the result.
#[derive(Clone)]
pub struct BurstProber {
    probe: Arc<dyn Probe>,
    count: u32,
    loss_threshold: u32,
    timeout: Duration,
}

impl BurstProber {
    pub fn new(probe: Arc<dyn Probe>, count: u32, loss_threshold: u32, timeout: Duration) -> Self {
        Self {
            probe,
            count,
            loss_threshold,
            timeout,
        }
    }

    /// Build a prober using the mechanism named in the settings.
    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self::new(
            probe_for(settings.method),
            settings.count,
            settings.loss_threshold,
            settings.timeout,
        )
    }

    /// Fire one burst at `address`. No retries, no pause between probes.
    pub async fn run(&self, address: &str) -> ProbeOutcome {
        let mut latencies = Vec::with_capacity(self.count as usize);
        for attempt in 0..self.count {
            match tokio::time::timeout(self.timeout, self.probe.check(address, self.timeout)).await {
                Ok(Some(rtt)) => latencies.push(rtt.as_secs_f64() * 1000.0),
                Ok(None) => {}
                Err(_) => debug!(%address, attempt, "probe timed out"),
            }
        }

        let outcome = classify(&latencies, self.loss_threshold);
        debug!(
            %address,
            successes = latencies.len(),
            count = self.count,
            status = %outcome.status,
            "probe burst complete"
        );
        outcome
    }
}

impl ProbeExecutor for BurstProber {
    fn execute<'a>(&'a self, address: &'a str) -> BoxFuture<'a, ProbeOutcome> {
        Box::pin(self.run(address))
    }
}
