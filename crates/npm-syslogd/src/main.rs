//! npm-syslogd — UDP syslog ingestion daemon.
//!
//! Binds UDP 514, parses RFC 3164/5424 datagrams, batches them into Postgres, and fans each one
//! out to the bus in real time — composing `npm_core::syslog::ingestor::SyslogIngestor` behind
//! an explicit multi-thread runtime, adapted to a `CancellationToken`-gated shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use npm_core::bus::BusClient;
use npm_core::config::{BusArgs, DbArgs};
use npm_core::db::SyslogRepo;
use npm_core::syslog::ingestor::SyslogIngestor;

/// UDP syslog ingestion daemon.
#[derive(Parser)]
#[command(name = "npm-syslogd", about = "Syslog UDP ingestion daemon", version)]
struct Cli {
    #[command(flatten)]
    db: DbArgs,

    #[command(flatten)]
    bus: BusArgs,

    /// UDP listen address.
    #[arg(long, default_value = "0.0.0.0:514", env = "NPM_SYSLOG_LISTEN")]
    listen: String,

    /// Increase logging verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    npm_core::config::init_logging(cli.verbose, cli.quiet);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async_main(cli));
}

async fn async_main(cli: Cli) {
    tracing::info!("npm-syslogd {} starting", env!("CARGO_PKG_VERSION"));

    let addr: SocketAddr = match cli.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(listen = %cli.listen, error = %e, "invalid listen address");
            std::process::exit(1);
        }
    };

    let pool = match npm_core::db::build_pool(&cli.db.database_url, cli.db.pool_size) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to build database pool");
            std::process::exit(1);
        }
    };
    let db = SyslogRepo::new(pool);

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

    let ingestor = match SyslogIngestor::bind(addr, db, Arc::new(bus)).await {
        Ok(ingestor) => Arc::new(ingestor),
        Err(e) => {
            tracing::error!(listen = %addr, error = %e, "failed to bind syslog UDP socket");
            std::process::exit(1);
        }
    };

    tracing::info!(listen = %addr, "listening for syslog datagrams");

    let cancel = CancellationToken::new();
    let shutdown_cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("received shutdown signal");
        shutdown_cancel.cancel();
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }

    ingestor.run(cancel).await;

    tracing::info!("shutdown complete");
}
