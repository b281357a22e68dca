//! retry-client: drive concurrent requests through one backoff policy and
//! record every retry it schedules.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use uuid::Uuid;

use retry_storm::client::{Driver, ServiceClient};
use retry_storm::config::loader::read_settings;
use retry_storm::config::ObservabilityConfig;
use retry_storm::observability::logging;
use retry_storm::observability::telemetry::write_csv;
use retry_storm::resilience::BackoffPolicy;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(100);

#[derive(Parser, Debug)]
#[command(name = "retry-client", version, about = "Retry policy load driver")]
struct Args {
    /// JSON settings document; `{{ id }}` is replaced per request
    #[arg(short, long, default_value = "appsettings.json")]
    settings: PathBuf,

    /// Backoff policy, by menu number (1-7) or name
    #[arg(short, long, default_value = "constant")]
    policy: BackoffPolicy,

    /// Number of concurrent logical requests
    #[arg(short = 'n', long, default_value_t = 10)]
    requests: usize,

    /// CSV output path (default: results/<uuid>.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the available policies and exit
    #[arg(long)]
    list_policies: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.list_policies {
        for (i, policy) in BackoffPolicy::ALL.iter().enumerate() {
            println!("{}. {:<24} {}", i + 1, policy.name(), policy.describe());
        }
        return Ok(());
    }

    logging::init_logging(&ObservabilityConfig {
        log_level: args.log_level.clone(),
        ..ObservabilityConfig::default()
    })?;

    let raw = read_settings(&args.settings)?;
    let client = ServiceClient::new(CLIENT_TIMEOUT)?;
    let driver = Driver::new(client, raw, args.policy);
    tracing::info!(policy = %args.policy, description = args.policy.describe(), "Policy selected");

    let report = driver.run(args.requests).await?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from("results").join(format!("{}.csv", Uuid::new_v4())));
    write_csv(&output, &driver.sink().snapshot())?;

    println!("policy:    {}", args.policy);
    println!("requests:  {}", report.requests);
    println!("succeeded: {}", report.succeeded);
    println!("exhausted: {}", report.exhausted);
    println!("aborted:   {}", report.aborted);
    println!("retries:   {}", report.retries);
    println!("elapsed:   {:.3}s", report.elapsed.as_secs_f64());
    println!("telemetry: {}", output.display());
    Ok(())
}
