//! Probe lifecycle: single runs and monitor mode
//!
//! Every run is strictly sequential. Ctrl+C is the only cancellation point
//! and aborts whatever probe, request or sleep is in flight.

use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tokio::signal;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::beacon::BeaconStatus;
use crate::checker::HealthChecker;
use crate::config::Config;
use crate::error::ProbeError;
use crate::execution::ExecutionStatus;
use crate::metrics::Metrics;
use crate::report::{Palette, Reporter};

/// Countdowns are shown only for intervals longer than this
const COUNTDOWN_THRESHOLD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Healthy,
    Unhealthy,
    /// Monitor mode ended by Ctrl+C
    MonitorStopped,
    /// A single run was aborted by Ctrl+C
    Interrupted,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Healthy | RunOutcome::MonitorStopped => 0,
            RunOutcome::Unhealthy => 1,
            RunOutcome::Interrupted => 130,
        }
    }
}

/// Results of one complete pass over both nodes
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub beacon: BeaconStatus,
    pub execution: ExecutionStatus,
    pub healthy: bool,
}

/// Run the probe with the given configuration, printing to stdout
pub async fn run(config: Config) -> Result<RunOutcome, ProbeError> {
    let metrics = Metrics::new();
    let checker = HealthChecker::new(&config, metrics.clone())?;
    let mut reporter = Reporter::new(std::io::stdout(), Palette::detect(config.color));

    match config.monitor_interval() {
        Some(interval) => {
            run_monitor(&config, &checker, &metrics, interval, &mut reporter).await;
            Ok(RunOutcome::MonitorStopped)
        }
        None => Ok(run_single(&config, &checker, &metrics, &mut reporter, signal::ctrl_c()).await),
    }
}

/// One probe run that `shutdown` can abort
async fn run_single<W: Write, S: Future>(
    config: &Config,
    checker: &HealthChecker,
    metrics: &Metrics,
    reporter: &mut Reporter<W>,
    shutdown: S,
) -> RunOutcome {
    tokio::select! {
        report = run_once(config, checker, metrics, reporter) => {
            if report.healthy { RunOutcome::Healthy } else { RunOutcome::Unhealthy }
        }
        _ = shutdown => {
            info!("Received Ctrl+C, aborting probe");
            reporter.line("\n🛑 Probe aborted");
            reporter.flush();
            RunOutcome::Interrupted
        }
    }
}

/// Probe both nodes once, print the summary and update metrics
pub async fn run_once<W: Write>(
    config: &Config,
    checker: &HealthChecker,
    metrics: &Metrics,
    reporter: &mut Reporter<W>,
) -> ProbeReport {
    reporter.banner("ETHEREUM NODE HEALTH CHECK");

    let beacon = checker.check_beacon_node(&config.beacon_url, reporter).await;
    let execution = checker
        .check_execution_node(&config.execution_url, reporter)
        .await;

    let healthy = reporter.summary(&beacon, &execution, &checker.network().name);
    reporter.footer(healthy);
    reporter.flush();

    info!(
        "Probe finished: beacon={} execution={}",
        beacon.health().label(),
        execution.health().label()
    );

    metrics.record_beacon(beacon.is_healthy(), beacon.peer_count.unwrap_or(0));
    metrics.record_execution(
        execution.is_healthy(),
        execution.peer_count.unwrap_or(0),
        execution.latest_block.unwrap_or(0),
    );
    metrics.run_completed(healthy);

    if let Some(path) = &config.metrics_file {
        if let Err(e) = metrics.write_textfile(path) {
            warn!("Failed to write metrics to {}: {}", path.display(), e);
        }
    }

    ProbeReport {
        beacon,
        execution,
        healthy,
    }
}

async fn run_monitor<W: Write>(
    config: &Config,
    checker: &HealthChecker,
    metrics: &Metrics,
    interval: Duration,
    reporter: &mut Reporter<W>,
) {
    reporter.line(&format!(
        "🔄 Monitor mode: checking every {} seconds",
        interval.as_secs()
    ));
    reporter.line("Press Ctrl+C to stop monitoring");

    let cycle = async {
        loop {
            run_once(config, checker, metrics, reporter).await;
            wait_for_next_run(interval, reporter).await;
        }
    };

    tokio::select! {
        _ = cycle => {}
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping monitor after {} runs", metrics.runs());
        }
    }

    reporter.line("\n🛑 Monitoring stopped");
    reporter.flush();
}

async fn wait_for_next_run<W: Write>(interval: Duration, reporter: &mut Reporter<W>) {
    if interval <= COUNTDOWN_THRESHOLD {
        sleep(interval).await;
        return;
    }

    for remaining in (1..=interval.as_secs()).rev() {
        reporter.progress(&format!("⏱️  Next check in {} seconds... ", remaining));
        sleep(Duration::from_secs(1)).await;
    }
    reporter.line("");
}
