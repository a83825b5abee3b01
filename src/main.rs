//! Ethprobe - Ethereum node health probe
//!
//! Checks a beacon node and an execution node, prints a report and exits
//! with 0 when both are healthy, 1 otherwise.

use ethprobe_core::{run, Config};
use std::error::Error;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // Parse CLI arguments and build config
    let config = Config::from_cli()?;

    // Initialize logging
    init_logging(&config.log_level);

    tracing::info!("Starting ethprobe...");

    let outcome = run(config).await?;

    Ok(ExitCode::from(outcome.exit_code()))
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
