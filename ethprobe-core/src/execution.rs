//! Execution-layer (JSON-RPC node) health check

use serde_json::{json, Value};
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::checker::HealthChecker;
use crate::report::{format_thousands, NodeHealth, Reporter, Status};
use crate::rpc::{quantity, RpcClient, RpcReply};
use crate::target::{parse_target, EXECUTION_DEFAULT_PORT};
use crate::thresholds::{NetworkIdentity, PeerTier};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionStatus {
    pub reachable: bool,
    /// `eth_chainId` returned a JSON-RPC result
    pub responding: bool,
    pub synced: Option<bool>,
    pub chain_id: Option<u64>,
    pub network: Option<NetworkIdentity>,
    pub latest_block: Option<u64>,
    pub blocks_behind: Option<u64>,
    pub block_age_secs: Option<u64>,
    pub peer_count: Option<u64>,
    pub peer_tier: Option<PeerTier>,
    pub issues: Vec<String>,
}

impl ExecutionStatus {
    pub fn is_healthy(&self) -> bool {
        self.reachable && self.responding
    }

    pub fn health(&self) -> NodeHealth {
        NodeHealth::from_flags(self.is_healthy(), self.synced)
    }
}

/// Interpretation of an `eth_syncing` result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Synced,
    Syncing {
        current: Option<u64>,
        highest: Option<u64>,
    },
    Unknown,
}

impl SyncState {
    pub fn from_result(result: &Value) -> Self {
        match result {
            Value::Bool(false) => SyncState::Synced,
            Value::Object(progress) => SyncState::Syncing {
                current: progress.get("currentBlock").and_then(quantity),
                highest: progress.get("highestBlock").and_then(quantity),
            },
            _ => SyncState::Unknown,
        }
    }

    pub fn blocks_behind(&self) -> Option<u64> {
        match self {
            SyncState::Syncing {
                current: Some(current),
                highest: Some(highest),
            } => Some(highest.saturating_sub(*current)),
            _ => None,
        }
    }
}

/// Seconds between the block timestamp and `now`, zero for future blocks
pub fn block_age_secs(block: &Value, now: SystemTime) -> Option<u64> {
    let timestamp = quantity(&block["timestamp"])?;
    let now = now.duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(now.saturating_sub(timestamp))
}

impl HealthChecker {
    /// Probe an execution node: TCP reachability, then chain id, latest
    /// block, sync state, peer count and latest block age.
    pub async fn check_execution_node<W: Write>(
        &self,
        url: &str,
        reporter: &mut Reporter<W>,
    ) -> ExecutionStatus {
        let network_name = self.network.name.clone();
        reporter.section(&format!("{} RPC NODE", network_name.to_uppercase()));
        let mut status = ExecutionStatus::default();

        let target = match parse_target(url, EXECUTION_DEFAULT_PORT) {
            Ok(target) => target,
            Err(e) => {
                reporter.log(Status::Error, &e.to_string());
                status.issues.push("Invalid URL format".to_string());
                return status;
            }
        };

        let connection = self.test_connection(&target, "RPC", reporter).await;
        if !connection.reachable() {
            status.issues.extend(connection.diagnosis.details);
            return status;
        }
        status.reachable = true;

        let rpc = RpcClient::new(self.http.clone(), target.base_url.clone());

        let (reply, perf) = rpc.call("eth_chainId", vec![]).await;
        match reply {
            RpcReply::Failed => {
                let details = vec![
                    format!("RPC check failed after {} attempts", perf.attempt_count),
                    format!("Errors: {}", perf.errors.join(", ")),
                ];
                reporter.log_with_details(
                    Status::Error,
                    &format!("{} RPC check failed", network_name),
                    &details,
                );
                status.issues.extend(details);
                return status;
            }
            RpcReply::Malformed(reason) => {
                reporter.log(Status::Error, &format!("Error parsing RPC response: {}", reason));
                status.issues.push(format!("RPC parsing error: {}", reason));
            }
            RpcReply::Result(value) => {
                status.responding = true;
                self.record_chain_id(&value, &mut status, reporter);
            }
        }

        let (reply, perf) = rpc.call("eth_blockNumber", vec![]).await;
        if let Some(block) = reply.result().and_then(quantity) {
            status.latest_block = Some(block);
            reporter.log(
                Status::Success,
                &format!("Latest block: {}", format_thousands(block)),
            );
            reporter.log(
                Status::Performance,
                &format!("Block query latency: {:.0}ms", perf.average_latency),
            );
        } else if reply.responded() {
            reporter.log(Status::Warning, "Latest block number unknown");
        } else {
            reporter.log(
                Status::Warning,
                &format!(
                    "Latest block number unknown ({} attempts failed)",
                    perf.attempt_count
                ),
            );
        }

        let (reply, _) = rpc.call("eth_syncing", vec![]).await;
        let sync = reply
            .result()
            .map(SyncState::from_result)
            .unwrap_or(SyncState::Unknown);
        match sync {
            SyncState::Synced => {
                status.synced = Some(true);
                reporter.log(
                    Status::Success,
                    &format!("{} node is fully synced", network_name),
                );
            }
            SyncState::Syncing { .. } => {
                status.synced = Some(false);
                status.blocks_behind = sync.blocks_behind();
                let behind = status
                    .blocks_behind
                    .map(|b| format!(" ({} blocks behind)", format_thousands(b)))
                    .unwrap_or_default();
                reporter.log(
                    Status::Warning,
                    &format!("{} node is syncing{}", network_name, behind),
                );
            }
            SyncState::Unknown => reporter.log(Status::Warning, "Sync status unknown"),
        }

        let (reply, _) = rpc.call("net_peerCount", vec![]).await;
        match reply.result().and_then(quantity) {
            Some(count) => {
                let tier = self.thresholds.execution_peers.classify(count);
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
            None => reporter.log(Status::Warning, "Peer count unknown"),
        }

        let (reply, _) = rpc
            .call("eth_getBlockByNumber", vec![json!("latest"), json!(false)])
            .await;
        match reply
            .result()
            .and_then(|block| block_age_secs(block, SystemTime::now()))
        {
            Some(age) => {
                status.block_age_secs = Some(age);
                if age > self.thresholds.max_block_age_secs {
                    reporter.log(Status::Warning, &format!("Latest block is {}s old", age));
                    status
                        .issues
                        .push(format!("Latest block is {}s old - node may be stalled", age));
                } else {
                    reporter.log(Status::Info, &format!("Latest block age: {}s", age));
                }
            }
            None => reporter.log(Status::Warning, "Latest block age unknown"),
        }

        info!(
            "Execution check complete: responding={} chain_id={:?} synced={:?} peers={:?}",
            status.responding, status.chain_id, status.synced, status.peer_count
        );
        status
    }

    fn record_chain_id<W: Write>(
        &self,
        value: &Value,
        status: &mut ExecutionStatus,
        reporter: &mut Reporter<W>,
    ) {
        let Some(chain_id) = quantity(value) else {
            reporter.log(Status::Warning, &format!("Unparseable chain ID: {}", value));
            status.issues.push("Unable to parse chain ID".to_string());
            return;
        };

        let identity = NetworkIdentity::from_chain_id(chain_id, self.network.expected_chain_id);
        status.chain_id = Some(chain_id);
        status.network = Some(identity);

        match identity {
            NetworkIdentity::Expected => reporter.log(
                Status::Success,
                &format!(
                    "Confirmed {} (Chain ID: {})",
                    self.network.name, chain_id
                ),
            ),
            NetworkIdentity::Mainnet => reporter.log(
                Status::Warning,
                &format!("Connected to Ethereum Mainnet instead of {}", self.network.name),
            ),
            NetworkIdentity::Unknown(id) => {
                reporter.log(Status::Warning, &format!("Unexpected chain ID: {}", id))
            }
        }
        if let Some(issue) = identity.issue() {
            status.issues.push(issue);
        }
    }
}
