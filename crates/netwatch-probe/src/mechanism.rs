//! Single reachability checks.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::debug;

use netwatch_core::ProbeMethod;

use crate::BoxFuture;

/// One reachability check against one address.
///
/// Resolves to the round-trip time on success and `None` on any failure.
/// Implementations need not enforce the timeout themselves; the burst
/// prober bounds every call.
pub trait Probe: Send + Sync {
    fn check<'a>(&'a self, address: &'a str, timeout: Duration) -> BoxFuture<'a, Option<Duration>>;
}

/// Build the probe mechanism selected in configuration.
pub fn probe_for(method: ProbeMethod) -> Arc<dyn Probe> {
    match method {
        ProbeMethod::Ping => Arc::new(PingProbe),
        ProbeMethod::Tcp(port) => Arc::new(TcpConnectProbe::new(port)),
    }
}

/// One ICMP echo through the platform `ping` utility.
///
/// Success is a zero exit status; latency is the wall-clock time of the
/// whole invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingProbe;

impl PingProbe {
    fn command(address: &str, timeout: Duration) -> Command {
        let mut cmd = Command::new("ping");
        if cfg!(windows) {
            let ms = timeout.as_millis().max(1).to_string();
            cmd.args(["-n", "1", "-w", ms.as_str(), address]);
        } else if cfg!(target_os = "macos") {
            let ms = timeout.as_millis().max(1).to_string();
            cmd.args(["-c", "1", "-W", ms.as_str(), address]);
        } else {
            // Linux ping takes whole seconds.
            let secs = timeout.as_secs_f64().ceil().max(1.0) as u64;
            cmd.args(["-c", "1", "-W", secs.to_string().as_str(), address]);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl Probe for PingProbe {
    fn check<'a>(&'a self, address: &'a str, timeout: Duration) -> BoxFuture<'a, Option<Duration>> {
        Box::pin(async move {
            let start = Instant::now();
            match Self::command(address, timeout).status().await {
                Ok(status) if status.success() => Some(start.elapsed()),
                Ok(status) => {
                    debug!(%address, code = ?status.code(), "ping probe failed");
                    None
                }
                Err(e) => {
                    debug!(%address, error = %e, "ping probe could not run");
                    None
                }
            }
        })
    }
}

/// A TCP connect to `address:port`; needs no raw-socket privileges.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnectProbe {
    port: u16,
}

impl TcpConnectProbe {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Probe for TcpConnectProbe {
    fn check<'a>(&'a self, address: &'a str, timeout: Duration) -> BoxFuture<'a, Option<Duration>> {
        Box::pin(async move {
            let start = Instant::now();
            match tokio::time::timeout(timeout, TcpStream::connect((address, self.port))).await {
                Ok(Ok(_stream)) => Some(start.elapsed()),
                Ok(Err(e)) => {
                    debug!(%address, port = self.port, error = %e, "tcp probe connection failed");
                    None
                }
                Err(_) => {
                    debug!(%address, port = self.port, "tcp probe timed out");
                    None
                }
            }
        })
    }
}
