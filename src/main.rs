//! retry-storm service.
//!
//! An overload-simulating HTTP service: a single admission gate caps how much
//! simulated work runs at once, and every request beyond that cap is turned
//! away immediately with `429 Too Many Requests` and a `Retry-After` hint.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /api/service
//!     ─────────────────▶ request id ─▶ trace ─▶ timeout ─▶ handler
//!                                                           │
//!                                                 AdmissionGate::try_permit
//!                                                  │                  │
//!                                              admitted            rejected
//!                                                  │                  │
//!                                       simulated work (1s)   429 + Retry-After
//!                                                  │
//!                                           permit dropped
//!                                                  │
//!     ◀────────────────────────────────────── 200 {"id"}
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use retry_storm::config::loader::load_config;
use retry_storm::config::ServiceConfig;
use retry_storm::http::ServiceServer;
use retry_storm::lifecycle::{wait_for_signal, Shutdown};
use retry_storm::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "retry-storm", version, about = "Overload-simulating HTTP service")]
struct Args {
    /// Path to the TOML service configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("retry-storm v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        capacity = config.admission.capacity,
        retry_after_secs = config.admission.retry_after_secs,
        work_latency_ms = config.admission.work_latency_ms,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    let server = ServiceServer::new(config);
    let mut serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut serving => result??,
        _ = wait_for_signal() => {
            shutdown.trigger();
            serving.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
