//! pgsocket-server
//!
//! # Architecture Overview
//!
//! ```text
//!   client ──▶ net::listener ──▶ preamble shim ──▶ session::RawSession ──▶ engine
//!              (accept, limit)   ('N' to SSLRequest,  (frame messages)     (execute_raw)
//!                                 replay, readiness)
//!
//!   --mode call:
//!   client ──▶ net::listener ──▶ session::RawSession ──▶ NegotiationGuard ──▶ engine
//! ```

use clap::Parser;

use pgsocket_server::config::cli::Cli;
use pgsocket_server::lifecycle::{signals, startup, Shutdown};
use pgsocket_server::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.resolve()?;

    observability::logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.mode,
        db = %config.engine.data_dir,
        "pgsocket-server starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    startup::run(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
