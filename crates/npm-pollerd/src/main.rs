//! npm-pollerd — poll scheduler and SNMPv3 collector daemon.
//!
//! Fetches a batch of due devices, polls each (ICMP + SNMPv3) with bounded concurrency, persists
//! results, pushes Prometheus metrics, and publishes device status to the bus — on a fixed
//! cadence until shut down.

mod poll;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use npm_core::config::{BusArgs, CryptoArgs, DbArgs, MetricsSinkArgs};
use npm_core::db::{DeviceRepo, MetricsRepo};
use npm_core::scheduler;
use npm_core::bus::BusClient;

use poll::PollContext;

/// Poll scheduler and SNMPv3 collector daemon.
#[derive(Parser)]
#[command(name = "npm-pollerd", about = "Network device poll scheduler and SNMPv3 collector", version)]
struct Cli {
    #[command(flatten)]
    db: DbArgs,

    #[command(flatten)]
    bus: BusArgs,

    #[command(flatten)]
    crypto: CryptoArgs,

    #[command(flatten)]
    metrics_sink: MetricsSinkArgs,

    /// Poll cycle cadence in seconds (spec §4.1 default).
    #[arg(long, default_value_t = 60)]
    interval_secs: u64,

    /// Devices fetched per cycle, ordered by last_poll ascending nulls-first.
    #[arg(long, default_value_t = 100)]
    batch_size: i64,

    /// Maximum devices polled concurrently within a cycle.
    #[arg(long, default_value_t = 20)]
    max_concurrent_polls: usize,

    /// Increase logging verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    npm_core::config::init_logging(cli.verbose, cli.quiet);

    tracing::info!("npm-pollerd {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        interval_secs = cli.interval_secs,
        batch_size = cli.batch_size,
        max_concurrent_polls = cli.max_concurrent_polls,
        "poll cycle configuration"
    );

    let pool = match npm_core::db::build_pool(&cli.db.database_url, cli.db.pool_size) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to build database pool");
            std::process::exit(1);
        }
    };
    let device_repo = Arc::new(DeviceRepo::new(pool.clone()));
    let metrics_repo = Arc::new(MetricsRepo::new(pool));

    let bus = match BusClient::connect(&cli.bus.nats_url).await {
        Ok(bus) => bus,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to NATS");
            std::process::exit(1);
        }
    };
    if let Err(e) = bus.ensure_topology().await {
        tracing::warn!(error = %e, "failed to ensure NATS stream/consumer topology");
    }
    let bus = Arc::new(bus);

    let ctx = Arc::new(PollContext {
        credential_secret: cli.crypto.credential_encryption_key.clone(),
        device_repo: device_repo.clone(),
        metrics_repo,
        bus,
        http: reqwest::Client::new(),
        victoria_url: cli.metrics_sink.victoria_url.clone(),
    });

    let cancel = CancellationToken::new();
    let shutdown_cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("received shutdown signal");
        shutdown_cancel.cancel();
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }

    let mut interval = tokio::time::interval(Duration::from_secs(cli.interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!("entering poll cycle loop");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                run_one_cycle(&ctx, &device_repo, cli.batch_size, cli.max_concurrent_polls, cancel.clone()).await;
            }
        }
    }

    tracing::info!("shutdown complete");
}

async fn run_one_cycle(
    ctx: &Arc<PollContext>,
    device_repo: &Arc<DeviceRepo>,
    batch_size: i64,
    max_concurrent: usize,
    cancel: CancellationToken,
) {
    let batch = match device_repo.fetch_poll_batch(batch_size).await {
        Ok(batch) => batch,
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch poll batch");
            return;
        }
    };

    if batch.is_empty() {
        tracing::debug!("no devices due for polling this cycle");
        return;
    }

    let cycle_size = batch.len();
    tracing::info!(devices = cycle_size, "starting poll cycle");

    let ctx = ctx.clone();
    let statuses = scheduler::run_cycle(batch, max_concurrent, cancel, move |device| {
        let ctx = ctx.clone();
        async move { poll::poll_device(ctx, device).await }
    })
    .await;

    let up = statuses.iter().filter(|s| matches!(s, npm_core::device::LinkStatus::Up)).count();
    tracing::info!(devices = cycle_size, up, down = cycle_size - up, "poll cycle complete");
}
