//! Raw TCP reachability probing
//!
//! Opens a fresh TCP connection per attempt and records how long the
//! connect took. Failures are recorded, never returned as errors.

use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Outcome of a single TCP connect attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionAttempt {
    pub success: bool,
    pub latency_ms: f64,
    /// 1-based attempt number
    pub attempt_index: u32,
    pub error: Option<String>,
}

impl ConnectionAttempt {
    pub fn succeeded(attempt_index: u32, latency_ms: f64) -> Self {
        Self {
            success: true,
            latency_ms,
            attempt_index,
            error: None,
        }
    }

    pub fn failed(attempt_index: u32, latency_ms: f64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            latency_ms,
            attempt_index,
            error: Some(error.into()),
        }
    }
}

/// Attempt `retries` TCP connects to `host:port`.
///
/// After each successful connect the prober pauses for `pacing` so that
/// consecutive attempts do not hit the listener back to back. Failed attempts
/// are retried immediately.
pub async fn probe(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    retries: u32,
    pacing: Duration,
) -> Vec<ConnectionAttempt> {
    let mut attempts = Vec::with_capacity(retries as usize);

    for attempt_index in 1..=retries {
        let start = Instant::now();
        let result = timeout(connect_timeout, TcpStream::connect((host, port))).await;
        let latency_ms = elapsed_ms(start);

        let attempt = match result {
            Ok(Ok(stream)) => {
                drop(stream);
                ConnectionAttempt::succeeded(attempt_index, latency_ms)
            }
            Ok(Err(e)) => ConnectionAttempt::failed(attempt_index, latency_ms, e.to_string()),
            Err(_) => ConnectionAttempt::failed(
                attempt_index,
                latency_ms,
                format!("timed out after {}s", connect_timeout.as_secs_f64()),
            ),
        };

        debug!(
            "TCP attempt {}/{} to {}:{}: success={} latency={:.1}ms error={:?}",
            attempt_index, retries, host, port, attempt.success, attempt.latency_ms, attempt.error
        );

        let success = attempt.success;
        attempts.push(attempt);

        if success {
            sleep(pacing).await;
        }
    }

    attempts
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
