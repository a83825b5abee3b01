//! Shared probe context for the beacon and execution checks

use std::io::Write;
use std::time::Duration;
use tracing::info;

use crate::config::{Config, NetworkConfig};
use crate::connection::{probe, ConnectionAttempt};
use crate::diagnosis::{classify, Diagnosis};
use crate::error::ProbeError;
use crate::metrics::Metrics;
use crate::report::{Reporter, Status};
use crate::request::RetryingClient;
use crate::target::Target;
use crate::thresholds::Thresholds;

/// Settings and clients needed by every node check
pub struct HealthChecker {
    pub(crate) http: RetryingClient,
    pub(crate) timeout: Duration,
    pub(crate) retries: u32,
    pub(crate) thresholds: Thresholds,
    pub(crate) network: NetworkConfig,
    pub(crate) metrics: Metrics,
}

/// TCP reachability of a node, with its classification
pub struct ConnectionReport {
    pub attempts: Vec<ConnectionAttempt>,
    pub diagnosis: Diagnosis,
}

impl ConnectionReport {
    pub fn reachable(&self) -> bool {
        self.attempts.iter().any(|a| a.success)
    }
}

impl HealthChecker {
    pub fn new(config: &Config, metrics: Metrics) -> Result<Self, ProbeError> {
        let http = RetryingClient::new(
            config.timeout(),
            config.retries,
            config.thresholds.retry_delay(),
            metrics.clone(),
        )?;

        Ok(Self {
            http,
            timeout: config.timeout(),
            retries: config.retries,
            thresholds: config.thresholds.clone(),
            network: config.network.clone(),
            metrics,
        })
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Probe the target over TCP, classify the attempts and report the result
    pub async fn test_connection<W: Write>(
        &self,
        target: &Target,
        label: &str,
        reporter: &mut Reporter<W>,
    ) -> ConnectionReport {
        reporter.log(
            Status::Info,
            &format!("Testing {} connection stability...", label),
        );

        let attempts = probe(
            &target.host,
            target.port,
            self.timeout,
            self.retries,
            self.thresholds.connect_pacing(),
        )
        .await;

        for attempt in &attempts {
            self.metrics.connection_attempted(attempt.success);
        }

        let diagnosis = classify(&attempts, target.port, self.timeout, &self.thresholds);
        info!(
            "{} connection to {}:{} classified as {}",
            label, target.host, target.port, diagnosis.severity
        );
        reporter.log_with_details(
            diagnosis.severity.into(),
            &format!("{} connection test complete", label),
            &diagnosis.details,
        );

        ConnectionReport {
            attempts,
            diagnosis,
        }
    }
}
