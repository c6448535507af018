//! netwatch-monitor — drives probes into the device registry.
//!
//! # Architecture
//!
//! ```text
//! PollingScheduler (background task)
//!   ├── every interval: snapshot registry addresses
//!   ├── bounded worker pool → ProbeExecutor::execute(address)
//!   └── DeviceRegistry::apply(address, outcome)
//!
//! Monitor (foreground)
//!   ├── add_device() → probe once → register + persist identity
//!   └── registry()   → status / events / export readers
//! ```
//!
//! Probes never run under the registry lock; each result is applied in its
//! own short critical section, so a slow device only delays itself.

pub mod monitor;
pub mod scheduler;

pub use monitor::{AddDeviceRequest, Monitor};
pub use scheduler::{CycleSummary, PollingScheduler};

#[cfg(test)]
pub(crate) mod testing;
