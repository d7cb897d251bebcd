//! The busybus daemon binary.
//!
//! # Usage
//!
//! ```bash
//! bbusd --sockpath /tmp/bbus.sock
//! ```

use busybus_daemon::{Daemon, DaemonConfig};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The busybus message bus daemon.
#[derive(Parser, Debug)]
#[command(name = "bbusd")]
#[command(about = "busybus message bus daemon")]
#[command(version)]
struct Args {
    /// Unix socket path to listen on. Falls back to `BBUS_SOCKPATH`, then
    /// the compiled-in default.
    #[arg(long)]
    sockpath: Option<String>,

    /// How long a single readiness poll blocks, in milliseconds.
    #[arg(long, default_value_t = busybus_transport::DEFAULT_POLL_TIMEOUT_MS)]
    poll_timeout_ms: u16,

    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// isn't set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let sockpath = args
        .sockpath
        .or_else(|| std::env::var("BBUS_SOCKPATH").ok())
        .unwrap_or_else(|| busybus_transport::DEFAULT_SOCKPATH.to_owned());

    tracing::info!("busybus daemon starting on {sockpath}");

    let config = DaemonConfig { sockpath, poll_timeout_ms: args.poll_timeout_ms };
    let mut daemon = Daemon::bind(config)?;
    daemon.install_signal_handlers()?;

    tracing::info!("listening, {} session(s) connected", daemon.session_count());
    daemon.run()?;

    tracing::info!("shutdown complete");
    Ok(())
}
