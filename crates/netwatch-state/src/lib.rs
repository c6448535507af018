//! netwatch-state — runtime device state for netwatch.
//!
//! Owns everything a probe result flows into:
//!
//! ```text
//! DeviceRegistry (one RwLock)
//!   ├── address → DeviceState   (status, history, loss episode)
//!   └── TransitionLog           (append-only status changes)
//!
//! IdentityStore                 (ips.txt, address + display metadata)
//! ```
//!
//! `DeviceState::apply` is the per-tick state machine. The registry runs it
//! and the matching log append under a single write guard, so readers never
//! observe a half-applied tick.

pub mod device;
pub mod error;
pub mod identity;
pub mod log;
pub mod registry;

pub use device::{
    DEFAULT_GROUP, DeviceIdentity, DeviceState, HISTORY_LEN, HistoryEntry, is_valid_address,
};
pub use error::{StateError, StateResult};
pub use identity::{IdentityStore, parse_record};
pub use log::{EVENTS_WINDOW, TransitionLog, TransitionRecord};
pub use registry::{AddOutcome, DeviceRegistry};
