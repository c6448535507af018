//! netwatch-core — shared primitives for the netwatch workspace.
//!
//! Holds the device status vocabulary, the probe outcome handed from the
//! prober to the state machine, timestamp rendering, and the
//! `netwatch.toml` configuration parser.

pub mod config;
pub mod types;

pub use config::{
    ConfigError, ConfigResult, NetwatchConfig, ProbeMethod, ProbeSettings, parse_duration,
};
pub use types::*;
