//! Consensus-layer (beacon node) health check
//!
//! Uses the standard Beacon API under `/eth/v1`. Numeric fields arrive as
//! decimal strings; anything missing or malformed is left as unknown.

use serde_json::Value;
use std::io::Write;
use tracing::{info, warn};

use crate::checker::HealthChecker;
use crate::report::{NodeHealth, Reporter, Status};
use crate::target::{parse_target, BEACON_DEFAULT_PORT};
use crate::thresholds::PeerTier;

pub const HEALTH_PATH: &str = "/eth/v1/node/health";
pub const SYNCING_PATH: &str = "/eth/v1/node/syncing";
pub const PEERS_PATH: &str = "/eth/v1/node/peers";
pub const VERSION_PATH: &str = "/eth/v1/node/version";
pub const HEAD_HEADER_PATH: &str = "/eth/v1/beacon/headers/head";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeaconStatus {
    pub reachable: bool,
    pub healthy: bool,
    /// `None` when the sync endpoint failed or returned an unexpected shape
    pub synced: Option<bool>,
    pub peer_count: Option<u64>,
    pub peer_tier: Option<PeerTier>,
    pub version: Option<String>,
    pub head_slot: Option<u64>,
    pub sync_distance: Option<u64>,
    pub health_latency_ms: Option<f64>,
    pub issues: Vec<String>,
}

impl BeaconStatus {
    pub fn is_healthy(&self) -> bool {
        self.reachable && self.healthy
    }

    pub fn health(&self) -> NodeHealth {
        NodeHealth::from_flags(self.is_healthy(), self.synced)
    }
}

/// Sync state reported by `/eth/v1/node/syncing`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeaconSync {
    pub is_syncing: Option<bool>,
    pub head_slot: Option<u64>,
    pub sync_distance: Option<u64>,
    pub el_offline: Option<bool>,
}

fn decimal(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

pub fn parse_sync(body: &Value) -> BeaconSync {
    let data = &body["data"];
    BeaconSync {
        is_syncing: data["is_syncing"].as_bool(),
        head_slot: decimal(&data["head_slot"]),
        sync_distance: decimal(&data["sync_distance"]),
        el_offline: data["el_offline"].as_bool(),
    }
}

/// Number of entries in the `data` array of `/eth/v1/node/peers`
pub fn parse_peer_count(body: &Value) -> Option<u64> {
    body["data"].as_array().map(|peers| peers.len() as u64)
}

pub fn parse_version(body: &Value) -> Option<String> {
    body["data"]["version"].as_str().map(str::to_string)
}

pub fn parse_head_slot(body: &Value) -> Option<u64> {
    decimal(&body["data"]["header"]["message"]["slot"])
}

impl HealthChecker {
    /// Probe a beacon node: TCP reachability, then health, sync, peers,
    /// version and head header.
    pub async fn check_beacon_node<W: Write>(
        &self,
        url: &str,
        reporter: &mut Reporter<W>,
    ) -> BeaconStatus {
        reporter.section("BEACON CHAIN NODE");
        let mut status = BeaconStatus::default();

        let target = match parse_target(url, BEACON_DEFAULT_PORT) {
            Ok(target) => target,
            Err(e) => {
                reporter.log(Status::Error, &e.to_string());
                status.issues.push("Invalid URL format".to_string());
                return status;
            }
        };

        let connection = self.test_connection(&target, "Beacon", reporter).await;
        if !connection.reachable() {
            status.issues.extend(connection.diagnosis.details);
            return status;
        }
        status.reachable = true;

        let (health, perf) = self.http.get(&target.endpoint(HEALTH_PATH)).await;
        if health.is_none() {
            let details = vec![
                format!("Health endpoint failed after {} attempts", perf.attempt_count),
                format!("Average latency: {:.0}ms", perf.average_latency),
                format!("Errors: {}", perf.errors.join(", ")),
            ];
            reporter.log_with_details(Status::Error, "Beacon health check failed", &details);
            status.issues.extend(details);
            return status;
        }

        status.healthy = true;
        status.health_latency_ms = Some(perf.average_latency);
        reporter.log(Status::Success, "Beacon node is healthy");
        reporter.log(
            Status::Performance,
            &format!("Health check latency: {:.0}ms", perf.average_latency),
        );

        self.beacon_sync(&target.endpoint(SYNCING_PATH), &mut status, reporter)
            .await;
        self.beacon_peers(&target.endpoint(PEERS_PATH), &mut status, reporter)
            .await;

        let (version, _) = self.http.get(&target.endpoint(VERSION_PATH)).await;
        status.version = version
            .and_then(|r| r.json::<Value>().ok())
            .and_then(|body| parse_version(&body));
        match &status.version {
            Some(version) => reporter.log(Status::Info, &format!("Client version: {}", version)),
            None => reporter.log(Status::Warning, "Client version unknown"),
        }

        let (header, _) = self.http.get(&target.endpoint(HEAD_HEADER_PATH)).await;
        match header
            .and_then(|r| r.json::<Value>().ok())
            .and_then(|body| parse_head_slot(&body))
        {
            Some(slot) => {
                status.head_slot = Some(slot);
                reporter.log(Status::Info, &format!("Head slot: {}", slot));
            }
            None => reporter.log(Status::Warning, "Head slot unknown"),
        }

        info!(
            "Beacon check complete: healthy={} synced={:?} peers={:?}",
            status.healthy, status.synced, status.peer_count
        );
        status
    }

    async fn beacon_sync<W: Write>(
        &self,
        url: &str,
        status: &mut BeaconStatus,
        reporter: &mut Reporter<W>,
    ) {
        let (response, _) = self.http.get(url).await;
        let sync = match response.map(|r| r.json::<Value>()) {
            Some(Ok(body)) => parse_sync(&body),
            Some(Err(e)) => {
                warn!("Beacon sync response is not JSON: {}", e);
                BeaconSync::default()
            }
            None => BeaconSync::default(),
        };

        status.head_slot = sync.head_slot;
        status.sync_distance = sync.sync_distance;

        match sync.is_syncing {
            Some(false) => {
                status.synced = Some(true);
                reporter.log(Status::Success, "Beacon node is synced");
            }
            Some(true) => {
                status.synced = Some(false);
                let behind = sync
                    .sync_distance
                    .map(|d| format!(" ({} slots behind)", d))
                    .unwrap_or_default();
                reporter.log(Status::Warning, &format!("Beacon node is syncing{}", behind));
            }
            None => reporter.log(Status::Warning, "Beacon sync status unknown"),
        }

        if sync.el_offline == Some(true) {
            reporter.log(Status::Error, "Beacon node reports its execution client offline");
            status
                .issues
                .push("Execution client offline (reported by beacon node)".to_string());
        }
    }

    async fn beacon_peers<W: Write>(
        &self,
        url: &str,
        status: &mut BeaconStatus,
        reporter: &mut Reporter<W>,
    ) {
        let (response, _) = self.http.get(url).await;
        let Some(count) = response
            .and_then(|r| r.json::<Value>().ok())
            .and_then(|body| parse_peer_count(&body))
        else {
            reporter.log(Status::Warning, "Beacon peer count unknown");
            return;
        };

        let tier = self.thresholds.beacon_peers.classify(count);
        status.peer_count = Some(count);
        status.peer_tier = Some(tier);

        let log_status = match tier {
            PeerTier::Excellent | PeerTier::Good => Status::Success,
            PeerTier::Minimal => Status::Warning,
            PeerTier::Poor => Status::Error,
        };
        reporter.log(
            log_status,
            &format!("{} peer connectivity: {} peers", tier, count),
        );
        if let Some(issue) = tier.issue() {
            status.issues.push(issue.to_string());
        }
    }
}
