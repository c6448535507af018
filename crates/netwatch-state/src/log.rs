//! Append-only log of device status transitions.

use std::collections::VecDeque;

use serde::Serialize;

use netwatch_core::{DeviceStatus, Timestamp, time_format};

pub use netwatch_core::EVENTS_WINDOW;

use crate::device::DeviceState;

/// One status change of one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub address: String,
    pub name: String,
    pub group: String,
    pub status: DeviceStatus,
    #[serde(rename = "time", with = "time_format")]
    pub at: Timestamp,
}

impl TransitionRecord {
    pub(crate) fn for_device(device: &DeviceState, at: Timestamp) -> Self {
        Self {
            address: device.address.clone(),
            name: device.name.clone(),
            group: device.group.clone(),
            status: device.status,
            at,
        }
    }
}

/// Transition records in append order.
///
/// Unbounded by default. With a cap, the oldest records are evicted once the
/// cap is reached. A cap is never smaller than [`EVENTS_WINDOW`], so the
/// events query sees the same records with or without one.
#[derive(Debug, Default)]
pub struct TransitionLog {
    records: VecDeque<TransitionRecord>,
    cap: Option<usize>,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cap(cap: Option<usize>) -> Self {
        Self {
            records: VecDeque::new(),
            cap: cap.filter(|c| *c > 0).map(|c| c.max(EVENTS_WINDOW)),
        }
    }

    pub fn push(&mut self, record: TransitionRecord) {
        if let Some(cap) = self.cap {
            while self.records.len() >= cap {
                self.records.pop_front();
            }
        }
        self.records.push_back(record);
    }

    /// The newest `n` records, most recent first.
    pub fn recent(&self, n: usize) -> Vec<TransitionRecord> {
        self.records.iter().rev().take(n).cloned().collect()
    }

    /// Every retained record, oldest first.
    pub fn all(&self) -> Vec<TransitionRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn record(i: usize) -> TransitionRecord {
        TransitionRecord {
            address: format!("10.0.0.{i}"),
            name: format!("dev-{i}"),
            group: "Default".to_string(),
            status: if i % 2 == 0 {
                DeviceStatus::Up
            } else {
                DeviceStatus::Down
            },
            at: Local::now(),
        }
    }

    #[test]
    fn recent_is_newest_first() {
        let mut log = TransitionLog::new();
        for i in 0..150 {
            log.push(record(i));
        }
        let recent = log.recent(EVENTS_WINDOW);
        assert_eq!(recent.len(), 100);
        assert_eq!(recent[0].address, "10.0.0.149");
        assert_eq!(recent[99].address, "10.0.0.50");
        assert_eq!(log.len(), 150);
    }

    #[test]
    fn recent_on_short_log() {
        let mut log = TransitionLog::new();
        log.push(record(0));
        log.push(record(1));
        let recent = log.recent(EVENTS_WINDOW);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].address, "10.0.0.1");
    }

    #[test]
    fn all_is_oldest_first() {
        let mut log = TransitionLog::new();
        for i in 0..3 {
            log.push(record(i));
        }
        let all = log.all();
        assert_eq!(all[0].address, "10.0.0.0");
        assert_eq!(all[2].address, "10.0.0.2");
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut log = TransitionLog::with_cap(Some(120));
        for i in 0..200 {
            log.push(record(i));
        }
        assert_eq!(log.len(), 120);
        assert_eq!(log.all()[0].address, "10.0.0.80");

        let recent = log.recent(EVENTS_WINDOW);
        assert_eq!(recent.len(), 100);
        assert_eq!(recent[0].address, "10.0.0.199");
    }

    #[test]
    fn small_cap_still_serves_full_window() {
        let mut log = TransitionLog::with_cap(Some(10));
        for i in 0..150 {
            log.push(record(i));
        }
        assert_eq!(log.len(), EVENTS_WINDOW);
        let recent = log.recent(EVENTS_WINDOW);
        assert_eq!(recent.len(), 100);
        assert_eq!(recent[0].address, "10.0.0.149");
        assert_eq!(recent[99].address, "10.0.0.50");
    }

    #[test]
    fn zero_cap_means_unbounded() {
        let mut log = TransitionLog::with_cap(Some(0));
        for i in 0..10 {
            log.push(record(i));
        }
        assert_eq!(log.len(), 10);
    }

    #[test]
    fn record_serializes_time_field() {
        let json = serde_json::to_value(record(1)).unwrap();
        assert_eq!(json["address"], "10.0.0.1");
        assert_eq!(json["status"], "down");
        assert!(json["time"].is_string());
    }
}
