//! Prometheus metrics for probe runs
//!
//! Thread-safe counters using atomic types, rendered in the text exposition
//! format so a node_exporter textfile collector can pick them up.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Metrics collector shared by every component of a probe run
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    // Run metrics
    runs: AtomicU64,
    healthy_runs: AtomicU64,
    last_run_timestamp: AtomicU64,

    // TCP probe metrics
    connection_attempts: AtomicU64,
    connection_failures: AtomicU64,

    // HTTP request metrics
    request_attempts: AtomicU64,
    request_failures: AtomicU64,

    // Last observed node state
    beacon_up: AtomicBool,
    execution_up: AtomicBool,
    beacon_peers: AtomicU64,
    execution_peers: AtomicU64,
    latest_block: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                runs: AtomicU64::new(0),
                healthy_runs: AtomicU64::new(0),
                last_run_timestamp: AtomicU64::new(0),
                connection_attempts: AtomicU64::new(0),
                connection_failures: AtomicU64::new(0),
                request_attempts: AtomicU64::new(0),
                request_failures: AtomicU64::new(0),
                beacon_up: AtomicBool::new(false),
                execution_up: AtomicBool::new(false),
                beacon_peers: AtomicU64::new(0),
                execution_peers: AtomicU64::new(0),
                latest_block: AtomicU64::new(0),
            }),
        }
    }

    // Run metrics

    pub fn run_completed(&self, healthy: bool) {
        self.inner.runs.fetch_add(1, Ordering::Relaxed);
        if healthy {
            self.inner.healthy_runs.fetch_add(1, Ordering::Relaxed);
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.inner.last_run_timestamp.store(now, Ordering::Relaxed);
    }

    pub fn runs(&self) -> u64 {
        self.inner.runs.load(Ordering::Relaxed)
    }

    pub fn healthy_runs(&self) -> u64 {
        self.inner.healthy_runs.load(Ordering::Relaxed)
    }

    // TCP probe metrics

    pub fn connection_attempted(&self, success: bool) {
        self.inner.connection_attempts.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.inner.connection_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn connection_attempts(&self) -> u64 {
        self.inner.connection_attempts.load(Ordering::Relaxed)
    }

    pub fn connection_failures(&self) -> u64 {
        self.inner.connection_failures.load(Ordering::Relaxed)
    }

    // HTTP request metrics

    pub fn request_attempted(&self) {
        self.inner.request_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_failed(&self) {
        self.inner.request_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_attempts(&self) -> u64 {
        self.inner.request_attempts.load(Ordering::Relaxed)
    }

    pub fn request_failures(&self) -> u64 {
        self.inner.request_failures.load(Ordering::Relaxed)
    }

    // Node state

    pub fn record_beacon(&self, up: bool, peers: u64) {
        self.inner.beacon_up.store(up, Ordering::Relaxed);
        self.inner.beacon_peers.store(peers, Ordering::Relaxed);
    }

    pub fn record_execution(&self, up: bool, peers: u64, latest_block: u64) {
        self.inner.execution_up.store(up, Ordering::Relaxed);
        self.inner.execution_peers.store(peers, Ordering::Relaxed);
        self.inner.latest_block.store(latest_block, Ordering::Relaxed);
    }

    /// Generate Prometheus-formatted metrics text
    pub fn to_prometheus(&self) -> String {
        let inner = &self.inner;
        format!(
            "# HELP ethprobe_runs_total Total number of completed probe runs\n\
             # TYPE ethprobe_runs_total counter\n\
             ethprobe_runs_total {}\n\
             \n\
             # HELP ethprobe_healthy_runs_total Probe runs where both nodes were healthy\n\
             # TYPE ethprobe_healthy_runs_total counter\n\
             ethprobe_healthy_runs_total {}\n\
             \n\
             # HELP ethprobe_last_run_timestamp_seconds Unix time of the last completed run\n\
             # TYPE ethprobe_last_run_timestamp_seconds gauge\n\
             ethprobe_last_run_timestamp_seconds {}\n\
             \n\
             # HELP ethprobe_connection_attempts_total TCP connect attempts\n\
             # TYPE ethprobe_connection_attempts_total counter\n\
             ethprobe_connection_attempts_total {}\n\
             \n\
             # HELP ethprobe_connection_failures_total Failed TCP connect attempts\n\
             # TYPE ethprobe_connection_failures_total counter\n\
             ethprobe_connection_failures_total {}\n\
             \n\
             # HELP ethprobe_request_attempts_total HTTP request attempts\n\
             # TYPE ethprobe_request_attempts_total counter\n\
             ethprobe_request_attempts_total {}\n\
             \n\
             # HELP ethprobe_request_failures_total HTTP request attempts without a 200 response\n\
             # TYPE ethprobe_request_failures_total counter\n\
             ethprobe_request_failures_total {}\n\
             \n\
             # HELP ethprobe_beacon_up Whether the beacon node was healthy in the last run\n\
             # TYPE ethprobe_beacon_up gauge\n\
             ethprobe_beacon_up {}\n\
             \n\
             # HELP ethprobe_execution_up Whether the execution node was healthy in the last run\n\
             # TYPE ethprobe_execution_up gauge\n\
             ethprobe_execution_up {}\n\
             \n\
             # HELP ethprobe_beacon_peers Beacon peer count in the last run\n\
             # TYPE ethprobe_beacon_peers gauge\n\
             ethprobe_beacon_peers {}\n\
             \n\
             # HELP ethprobe_execution_peers Execution peer count in the last run\n\
             # TYPE ethprobe_execution_peers gauge\n\
             ethprobe_execution_peers {}\n\
             \n\
             # HELP ethprobe_latest_block Latest execution block number in the last run\n\
             # TYPE ethprobe_latest_block gauge\n\
             ethprobe_latest_block {}\n",
            self.runs(),
            self.healthy_runs(),
            inner.last_run_timestamp.load(Ordering::Relaxed),
            self.connection_attempts(),
            self.connection_failures(),
            self.request_attempts(),
            self.request_failures(),
            inner.beacon_up.load(Ordering::Relaxed) as u8,
            inner.execution_up.load(Ordering::Relaxed) as u8,
            inner.beacon_peers.load(Ordering::Relaxed),
            inner.execution_peers.load(Ordering::Relaxed),
            inner.latest_block.load(Ordering::Relaxed),
        )
    }

    /// Write the exposition text to `path` via a sibling temp file and rename
    pub fn write_textfile(&self, path: &Path) -> std::io::Result<()> {
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.to_prometheus())?;
        std::fs::rename(&tmp, path)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
