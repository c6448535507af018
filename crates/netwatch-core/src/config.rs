//! netwatch.toml configuration parser.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::EVENTS_WINDOW;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetwatchConfig {
    pub probe: ProbeConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub interval: String,
    pub count: u32,
    pub loss_threshold: u32,
    pub timeout: String,
    pub method: String,
    pub concurrency: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: "5s".to_string(),
            count: 3,
            loss_threshold: 1,
            timeout: "1s".to_string(),
            method: "ping".to_string(),
            concurrency: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub identity_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            identity_file: PathBuf::from("ips.txt"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Cap on retained transition records; unbounded when absent.
    /// Must be at least the events window.
    pub max_entries: Option<usize>,
}

/// How a single reachability check is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    /// One echo request through the platform `ping` utility.
    Ping,
    /// A TCP connect to the given port.
    Tcp(u16),
}

impl FromStr for ProbeMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("ping") {
            return Ok(ProbeMethod::Ping);
        }
        if let Some(port) = s.strip_prefix("tcp:") {
            return port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .map(ProbeMethod::Tcp)
                .ok_or_else(|| ConfigError::Invalid(format!("invalid tcp probe port: {port}")));
        }
        Err(ConfigError::Invalid(format!("unknown probe method: {s}")))
    }
}

/// Fully resolved probe settings, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub interval: Duration,
    pub count: u32,
    pub loss_threshold: u32,
    pub timeout: Duration,
    pub method: ProbeMethod,
    pub concurrency: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            count: 3,
            loss_threshold: 1,
            timeout: Duration::from_secs(1),
            method: ProbeMethod::Ping,
            concurrency: 16,
        }
    }
}

impl NetwatchConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: NetwatchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate and resolve the `[probe]` table.
    pub fn probe_settings(&self) -> ConfigResult<ProbeSettings> {
        let p = &self.probe;
        let interval = parse_duration(&p.interval)
            .ok_or_else(|| ConfigError::Invalid(format!("invalid probe interval: {}", p.interval)))?;
        let timeout = parse_duration(&p.timeout)
            .ok_or_else(|| ConfigError::Invalid(format!("invalid probe timeout: {}", p.timeout)))?;

        if interval.is_zero() {
            return Err(ConfigError::Invalid("probe interval must be non-zero".into()));
        }
        if timeout.is_zero() {
            return Err(ConfigError::Invalid("probe timeout must be non-zero".into()));
        }
        if p.count == 0 {
            return Err(ConfigError::Invalid("probe count must be at least 1".into()));
        }
        if p.loss_threshold >= p.count {
            return Err(ConfigError::Invalid(format!(
                "loss_threshold ({}) must be less than count ({})",
                p.loss_threshold, p.count
            )));
        }
        if p.concurrency == 0 {
            return Err(ConfigError::Invalid("probe concurrency must be at least 1".into()));
        }

        Ok(ProbeSettings {
            interval,
            count: p.count,
            loss_threshold: p.loss_threshold,
            timeout,
            method: p.method.parse()?,
            concurrency: p.concurrency,
        })
    }

    /// Validate the `[log]` table and return the transition log cap.
    pub fn log_cap(&self) -> ConfigResult<Option<usize>> {
        match self.log.max_entries {
            Some(cap) if cap < EVENTS_WINDOW => Err(ConfigError::Invalid(format!(
                "log max_entries ({cap}) must be at least {EVENTS_WINDOW}"
            ))),
            cap => Ok(cap),
        }
    }

    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.server.bind)))
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let config = NetwatchConfig::default();
        let probe = config.probe_settings().unwrap();
        assert_eq!(probe, ProbeSettings::default());
        assert_eq!(config.bind_addr().unwrap().port(), 5000);
        assert_eq!(config.store.identity_file, PathBuf::from("ips.txt"));
        assert!(config.log.max_entries.is_none());
    }

    #[test]
    fn parse_partial_file() {
        let toml_str = r#"
[probe]
interval = "10s"
count = 5
loss_threshold = 2
method = "tcp:22"

[log]
max_entries = 500
"#;
        let config: NetwatchConfig = toml::from_str(toml_str).unwrap();
        let probe = config.probe_settings().unwrap();
        assert_eq!(probe.interval, Duration::from_secs(10));
        assert_eq!(probe.count, 5);
        assert_eq!(probe.loss_threshold, 2);
        assert_eq!(probe.timeout, Duration::from_secs(1));
        assert_eq!(probe.method, ProbeMethod::Tcp(22));
        assert_eq!(config.log.max_entries, Some(500));
    }

    #[test]
    fn threshold_must_be_below_count() {
        let mut config = NetwatchConfig::default();
        config.probe.loss_threshold = 3;
        assert!(matches!(config.probe_settings(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_count_rejected() {
        let mut config = NetwatchConfig::default();
        config.probe.count = 0;
        config.probe.loss_threshold = 0;
        assert!(config.probe_settings().is_err());
    }

    #[test]
    fn unknown_method_rejected() {
        assert!("icmp-raw".parse::<ProbeMethod>().is_err());
        assert!("tcp:0".parse::<ProbeMethod>().is_err());
        assert!("tcp:http".parse::<ProbeMethod>().is_err());
        assert_eq!("PING".parse::<ProbeMethod>().unwrap(), ProbeMethod::Ping);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = NetwatchConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.probe.count, 3);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netwatch.toml");
        std::fs::write(&path, "[probe\ncount = ").unwrap();
        assert!(matches!(
            NetwatchConfig::load_or_default(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn log_cap_below_events_window_rejected() {
        let config: NetwatchConfig = toml::from_str("[log]\nmax_entries = 10").unwrap();
        assert!(matches!(config.log_cap(), Err(ConfigError::Invalid(_))));

        let config: NetwatchConfig = toml::from_str("[log]\nmax_entries = 100").unwrap();
        assert_eq!(config.log_cap().unwrap(), Some(100));
        assert_eq!(NetwatchConfig::default().log_cap().unwrap(), None);
    }

    #[test]
    fn huge_minute_interval_is_invalid_not_a_panic() {
        assert_eq!(parse_duration("400000000000000000m"), None);

        let mut config = NetwatchConfig::default();
        config.probe.interval = "400000000000000000m".to_string();
        assert!(matches!(config.probe_settings(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("soon"), None);
    }
}
