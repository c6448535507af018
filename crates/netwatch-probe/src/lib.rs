//! netwatch-probe — reachability probing for netwatch.
//!
//! A probe burst fires `count` sequential checks at one address, each bounded
//! by the per-probe timeout, and classifies the number of successes:
//!
//! ```text
//! successes == 0               → DOWN  (no latency)
//! 0 < successes <= threshold   → LOSS  (mean latency of successes)
//! successes > threshold        → UP    (mean latency of successes)
//! ```
//!
//! The single-check mechanism is a [`Probe`] (system `ping` or TCP connect);
//! [`BurstProber`] turns it into a [`ProbeExecutor`], the capability the
//! monitor depends on. Every failure mode (timeout, unreachable, spawn error)
//! is just "no success" and never surfaces as an error.

pub mod burst;
pub mod mechanism;

pub use burst::{BurstProber, ProbeExecutor, classify, classify_successes};
pub use mechanism::{PingProbe, Probe, TcpConnectProbe, probe_for};

/// Boxed future returned by the probe traits.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
