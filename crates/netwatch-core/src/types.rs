//! Shared types used across netwatch crates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Wall-clock instant attached to history entries and transition records.
pub type Timestamp = DateTime<Local>;

/// Rendering used for every timestamp leaving the process.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Number of transition records returned by the events query.
pub const EVENTS_WINDOW: usize = 100;

/// Health classification of a device after one probe burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// More than the loss threshold of probes succeeded.
    Up,
    /// No probe in the burst succeeded.
    Down,
    /// Some probes succeeded, but no more than the loss threshold.
    Loss,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Up => "up",
            DeviceStatus::Down => "down",
            DeviceStatus::Loss => "loss",
        }
    }

    /// Whether this status should be surfaced at warning level.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, DeviceStatus::Up)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(DeviceStatus::Up),
            "down" => Ok(DeviceStatus::Down),
            "loss" => Ok(DeviceStatus::Loss),
            other => Err(format!("unknown device status: {other}")),
        }
    }
}

/// Classified result of one probe burst against one address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub status: DeviceStatus,
    /// Mean round-trip of the successful probes, in milliseconds.
    /// `None` exactly when `status` is [`DeviceStatus::Down`].
    pub latency_ms: Option<f64>,
}

impl ProbeOutcome {
    pub fn down() -> Self {
        Self {
            status: DeviceStatus::Down,
            latency_ms: None,
        }
    }

    pub fn up(latency_ms: f64) -> Self {
        Self {
            status: DeviceStatus::Up,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn loss(latency_ms: f64) -> Self {
        Self {
            status: DeviceStatus::Loss,
            latency_ms: Some(latency_ms),
        }
    }
}

/// Format a timestamp the way every external surface shows it.
pub fn format_time(ts: &Timestamp) -> String {
    ts.format(TIME_FORMAT).to_string()
}

/// Serde helpers that render a [`Timestamp`] with [`TIME_FORMAT`].
pub mod time_format {
    use serde::Serializer;

    use super::{Timestamp, format_time};

    pub fn serialize<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_time(ts))
    }

    pub mod option {
        use serde::Serializer;

        use crate::types::{Timestamp, format_time};

        pub fn serialize<S: Serializer>(ts: &Option<Timestamp>, s: S) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_str(&format_time(ts)),
                None => s.serialize_none(),
            }
        }
    }
}
