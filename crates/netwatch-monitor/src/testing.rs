//! Deterministic probe executor for tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netwatch_core::ProbeOutcome;
use netwatch_probe::{BoxFuture, ProbeExecutor};

/// Replays per-address outcome scripts. The last scripted outcome repeats
/// once a script runs out; unscripted addresses are always down.
#[derive(Default)]
pub(crate) struct ScriptedExecutor {
    scripts: Mutex<HashMap<String, VecDeque<ProbeOutcome>>>,
    panic_on: Mutex<HashSet<String>>,
    slow: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn with(self: Arc<Self>, address: &str, outcomes: &[ProbeOutcome]) -> Arc<Self> {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), outcomes.iter().copied().collect());
        self
    }

    pub(crate) fn panicking_on(self: Arc<Self>, address: &str) -> Arc<Self> {
        self.panic_on.lock().unwrap().insert(address.to_string());
        self
    }

    pub(crate) fn slow_on(self: Arc<Self>, address: &str, delay: Duration) -> Arc<Self> {
        self.slow.lock().unwrap().insert(address.to_string(), delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, address: &str) -> ProbeOutcome {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(address) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => script.front().copied().unwrap_or_else(ProbeOutcome::down),
            None => ProbeOutcome::down(),
        }
    }
}

impl ProbeExecutor for ScriptedExecutor {
    fn execute<'a>(&'a self, address: &'a str) -> BoxFuture<'a, ProbeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let panics = self.panic_on.lock().unwrap().contains(address);
        let delay = self.slow.lock().unwrap().get(address).copied();
        let outcome = self.next_outcome(address);
        Box::pin(async move {
            if panics {
                panic!("scripted probe failure for {address}");
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }
}
