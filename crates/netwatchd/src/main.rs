//! netwatchd — the netwatch daemon.
//!
//! Single binary that assembles the monitor:
//! - Identity store (`ips.txt`)
//! - Device registry + transition log
//! - Burst prober
//! - Polling scheduler
//! - HTTP API
//!
//! # Usage
//!
//! ```text
//! netwatchd run --config /etc/netwatch/netwatch.toml --bind 0.0.0.0:5000
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::info;

use netwatch_core::NetwatchConfig;
use netwatch_monitor::Monitor;
use netwatch_probe::BurstProber;
use netwatch_state::{DeviceRegistry, IdentityStore};

const DEFAULT_CONFIG: &str = "netwatch.toml";

#[derive(Parser)]
#[command(name = "netwatchd", about = "netwatch reachability daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Poll every registered device and serve the HTTP API.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to netwatch.toml. Falls back to ./netwatch.toml when present.
    #[arg(long, env = "NETWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Address the HTTP API listens on.
    #[arg(long)]
    bind: Option<String>,

    /// Identity store path.
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// Polling interval, e.g. `5s`.
    #[arg(long)]
    interval: Option<String>,

    /// Probes per burst.
    #[arg(long)]
    count: Option<u32>,

    /// Highest success count still classified as loss.
    #[arg(long)]
    loss_threshold: Option<u32>,

    /// Per-probe timeout, e.g. `1s`.
    #[arg(long)]
    timeout: Option<String>,

    /// Probe mechanism: `ping` or `tcp:<port>`.
    #[arg(long)]
    method: Option<String>,
}

impl RunArgs {
    fn load_config(&self) -> anyhow::Result<NetwatchConfig> {
        let mut config = match &self.config {
            Some(path) => NetwatchConfig::from_file(path)?,
            None => NetwatchConfig::load_or_default(Path::new(DEFAULT_CONFIG))?,
        };

        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(path) = &self.identity_file {
            config.store.identity_file = path.clone();
        }
        if let Some(interval) = &self.interval {
            config.probe.interval = interval.clone();
        }
        if let Some(count) = self.count {
            config.probe.count = count;
        }
        if let Some(threshold) = self.loss_threshold {
            config.probe.loss_threshold = threshold;
        }
        if let Some(timeout) = &self.timeout {
            config.probe.timeout = timeout.clone();
        }
        if let Some(method) = &self.method {
            config.probe.method = method.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,netwatchd=debug,netwatch=debug"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    info!("netwatch daemon starting");

    let config = args.load_config()?;
    let settings = config.probe_settings()?;
    let addr = config.bind_addr()?;
    let log_cap = config.log_cap()?;

    // ── Initialize subsystems ──────────────────────────────────

    let registry = DeviceRegistry::with_log_cap(log_cap);
    let prober = Arc::new(BurstProber::from_settings(&settings));
    let identities = IdentityStore::new(config.store.identity_file.clone());
    let monitor = Monitor::new(registry, prober, identities);

    let store_path = monitor.identity_store().path().display();
    let loaded = monitor
        .load_identities()
        .await
        .with_context(|| format!("failed to load identity store {store_path}"))?;
    info!(devices = loaded, path = %store_path, "identity store loaded");
    info!(
        interval_ms = settings.interval.as_millis() as u64,
        count = settings.count,
        loss_threshold = settings.loss_threshold,
        method = ?settings.method,
        "prober initialized"
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let scheduler = monitor.scheduler(&settings);
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(shutdown_rx).await;
    });

    // ── Start API server ───────────────────────────────────────

    let router = netwatch_api::build_router(monitor);
    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Let the scheduler finish its current cycle.
    let _ = scheduler_handle.await;

    info!("netwatch daemon stopped");
    Ok(())
}
