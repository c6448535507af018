//! Per-device runtime record and the tick state machine.

use serde::Serialize;

use netwatch_core::{DeviceStatus, ProbeOutcome, Timestamp, time_format};

use crate::log::TransitionRecord;

/// Maximum number of entries kept in a device's status history.
pub const HISTORY_LEN: usize = 3;

/// Group assigned to devices registered without one.
pub const DEFAULT_GROUP: &str = "Default";

/// Address plus display metadata, as kept in the identity store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub address: String,
    pub name: String,
    pub group: String,
    pub short_label: String,
}

impl DeviceIdentity {
    /// Build an identity, defaulting blank or missing metadata:
    /// name falls back to the address, group to `"Default"`, short label to `""`.
    ///
    /// Field separators and line breaks are replaced by spaces so every
    /// identity fits on one identity-store line.
    pub fn new(
        address: &str,
        name: Option<&str>,
        group: Option<&str>,
        short_label: Option<&str>,
    ) -> Self {
        let address = sanitize(address);
        let present = |v: Option<&str>| v.map(sanitize).filter(|v| !v.is_empty());
        Self {
            name: present(name).unwrap_or_else(|| address.clone()),
            group: present(group).unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            short_label: present(short_label).unwrap_or_default(),
            address,
        }
    }
}

/// Whether `address` can be handed to a probe as a host argument.
///
/// Rejects empty addresses, embedded whitespace, and anything a command-line
/// tool would read as an option.
pub fn is_valid_address(address: &str) -> bool {
    !address.is_empty()
        && !address.starts_with('-')
        && !address.chars().any(char::is_whitespace)
}

fn sanitize(value: &str) -> String {
    value.replace([',', '\r', '\n'], " ").trim().to_string()
}

/// One entry of a device's rolling status history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub status: DeviceStatus,
    #[serde(rename = "time", with = "time_format")]
    pub at: Timestamp,
}

/// Runtime record for one monitored address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    #[serde(skip_serializing)]
    pub address: String,
    pub name: String,
    pub group: String,
    pub short_label: String,
    pub status: DeviceStatus,
    /// Mean latency in milliseconds; `None` while the device is down.
    pub latency: Option<f64>,
    /// Up to [`HISTORY_LEN`] status changes, newest last.
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing)]
    pub last_logged_status: Option<DeviceStatus>,
    pub is_loss: bool,
    #[serde(with = "time_format::option")]
    pub loss_since: Option<Timestamp>,
}

impl DeviceState {
    /// Placeholder state for a device loaded at startup, pending its first tick.
    pub fn placeholder(identity: DeviceIdentity) -> Self {
        Self {
            address: identity.address,
            name: identity.name,
            group: identity.group,
            short_label: identity.short_label,
            status: DeviceStatus::Down,
            latency: None,
            history: Vec::new(),
            last_logged_status: None,
            is_loss: false,
            loss_since: None,
        }
    }

    /// State for a device whose very first probe has just completed.
    ///
    /// Equivalent to applying `outcome` to a placeholder, so the record has one
    /// history entry and always yields one transition record.
    pub fn first_tick(
        identity: DeviceIdentity,
        outcome: ProbeOutcome,
        now: Timestamp,
    ) -> (Self, TransitionRecord) {
        let mut state = Self::placeholder(identity);
        let record = state
            .apply(outcome, now)
            .unwrap_or_else(|| TransitionRecord::for_device(&state, now));
        (state, record)
    }

    /// Apply one probe outcome. Returns the transition record to append when
    /// the status differs from the last logged one.
    ///
    /// Callers must hold exclusive access to both this record and the
    /// transition log for the whole call.
    pub fn apply(&mut self, outcome: ProbeOutcome, now: Timestamp) -> Option<TransitionRecord> {
        let status_now = outcome.status;

        if self.history.last().map(|h| h.status) != Some(status_now) {
            self.history.push(HistoryEntry {
                status: status_now,
                at: now,
            });
            if self.history.len() > HISTORY_LEN {
                let excess = self.history.len() - HISTORY_LEN;
                self.history.drain(..excess);
            }
        }

        let loss_now = status_now == DeviceStatus::Loss;
        if loss_now && !self.is_loss {
            self.loss_since = Some(now);
        }
        if !loss_now {
            self.loss_since = None;
        }
        self.is_loss = loss_now;

        self.status = status_now;
        self.latency = match status_now {
            DeviceStatus::Down => None,
            _ => outcome.latency_ms,
        };

        if self.last_logged_status != Some(status_now) {
            self.last_logged_status = Some(status_now);
            Some(TransitionRecord::for_device(self, now))
        } else {
            None
        }
    }
}
