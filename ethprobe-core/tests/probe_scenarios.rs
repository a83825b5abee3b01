//! End-to-end probe runs against in-process mock nodes
//!
//! A mock beacon node and a mock execution node are served with axum on
//! ephemeral localhost ports; the probe then runs exactly as the CLI would.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use ethprobe_core::{
    run_once, Config, HealthChecker, Metrics, NetworkIdentity, NodeHealth, Palette, PeerTier,
    ProbeReport, Reporter,
};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

#[derive(Clone)]
struct BeaconMock {
    health: StatusCode,
    is_syncing: bool,
    sync_distance: u64,
    peers: usize,
    head: StatusCode,
}

impl Default for BeaconMock {
    fn default() -> Self {
        Self {
            health: StatusCode::OK,
            is_syncing: false,
            sync_distance: 0,
            peers: 25,
            head: StatusCode::OK,
        }
    }
}

#[derive(Clone)]
struct ExecutionMock {
    chain_id: &'static str,
    syncing: Value,
    peers: &'static str,
    block_number: u64,
    block_age_secs: u64,
    malformed: bool,
    /// Methods answered with HTTP 500
    failing: &'static [&'static str],
}

impl Default for ExecutionMock {
    fn default() -> Self {
        Self {
            chain_id: "0xaa36a7",
            syncing: json!(false),
            peers: "0xf",
            block_number: 7_123_456,
            block_age_secs: 6,
            malformed: false,
            failing: &[],
        }
    }
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_beacon(mock: BeaconMock) -> String {
    let app = Router::new()
        .route(
            "/eth/v1/node/health",
            get(|State(mock): State<BeaconMock>| async move { mock.health }),
        )
        .route(
            "/eth/v1/node/syncing",
            get(|State(mock): State<BeaconMock>| async move {
                Json(json!({
                    "data": {
                        "head_slot": "4812345",
                        "sync_distance": mock.sync_distance.to_string(),
                        "is_syncing": mock.is_syncing,
                        "is_optimistic": false,
                        "el_offline": false
                    }
                }))
            }),
        )
        .route(
            "/eth/v1/node/peers",
            get(|State(mock): State<BeaconMock>| async move {
                let peers: Vec<Value> = (0..mock.peers)
                    .map(|i| json!({"peer_id": format!("16Uiu2Peer{}", i), "state": "connected"}))
                    .collect();
                Json(json!({"data": peers, "meta": {"count": mock.peers}}))
            }),
        )
        .route(
            "/eth/v1/node/version",
            get(|| async { Json(json!({"data": {"version": "Lighthouse/v5.3.0/x86_64-linux"}})) }),
        )
        .route(
            "/eth/v1/beacon/headers/head",
            get(|State(mock): State<BeaconMock>| async move {
                if mock.head != StatusCode::OK {
                    return mock.head.into_response();
                }
                Json(json!({
                    "data": {
                        "root": "0x1234",
                        "canonical": true,
                        "header": {"message": {"slot": "4812346"}}
                    }
                }))
                .into_response()
            }),
        )
        .with_state(mock);
    serve(app).await
}

async fn execution_rpc(
    State(mock): State<ExecutionMock>,
    Json(request): Json<Value>,
) -> axum::response::Response {
    if mock.malformed {
        return (StatusCode::OK, "this is not json").into_response();
    }
    let method = request["method"].as_str().unwrap_or_default();
    if mock.failing.contains(&method) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let result = match method {
        "eth_chainId" => json!(mock.chain_id),
        "eth_blockNumber" => json!(format!("0x{:x}", mock.block_number)),
        "eth_syncing" => mock.syncing.clone(),
        "net_peerCount" => json!(mock.peers),
        "eth_getBlockByNumber" => json!({
            "number": format!("0x{:x}", mock.block_number),
            "timestamp": format!("0x{:x}", now - mock.block_age_secs),
        }),
        other => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": -32601, "message": format!("method {} not found", other)}
            }))
            .into_response()
        }
    };

    Json(json!({"jsonrpc": "2.0", "id": request["id"], "result": result})).into_response()
}

async fn spawn_execution(mock: ExecutionMock) -> String {
    let app = Router::new()
        .route("/", post(execution_rpc))
        .with_state(mock);
    serve(app).await
}

async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn test_config(beacon_url: String, execution_url: String) -> Config {
    let mut config = Config::default();
    config.beacon_url = beacon_url;
    config.execution_url = execution_url;
    config.timeout_secs = 2;
    config.retries = 2;
    config.color = false;
    config.thresholds.retry_delay_ms = 10;
    config.thresholds.connect_pacing_ms = 1;
    config
}

async fn probe(config: &Config) -> (ProbeReport, String, Metrics) {
    init_tracing();
    let metrics = Metrics::new();
    let checker = HealthChecker::new(config, metrics.clone()).unwrap();
    let mut reporter = Reporter::new(Vec::new(), Palette::Plain);
    let report = run_once(config, &checker, &metrics, &mut reporter).await;
    let output = String::from_utf8(reporter.into_inner()).unwrap();
    (report, output, metrics)
}

#[tokio::test]
async fn test_beacon_down_execution_optimal() {
    let execution = spawn_execution(ExecutionMock {
        peers: "0xa",
        ..Default::default()
    })
    .await;
    let config = test_config(refused_url().await, execution);

    let (report, output, metrics) = probe(&config).await;

    assert!(!report.healthy);
    assert!(!report.beacon.reachable);
    assert_eq!(report.beacon.health(), NodeHealth::Critical);
    assert!(report
        .beacon
        .issues
        .iter()
        .any(|i| i == "Port closed or service not responding"));

    assert_eq!(report.execution.health(), NodeHealth::Optimal);
    assert_eq!(report.execution.chain_id, Some(11_155_111));
    assert_eq!(report.execution.network, Some(NetworkIdentity::Expected));
    assert_eq!(report.execution.peer_count, Some(10));
    assert_eq!(report.execution.peer_tier, Some(PeerTier::Good));

    assert!(output.contains("Beacon Chain: CRITICAL"));
    assert!(output.contains("Sepolia RPC: OPTIMAL"));
    assert!(output.contains("Issues detected"));
    assert_eq!(metrics.runs(), 1);
    assert_eq!(metrics.healthy_runs(), 0);
    assert_eq!(metrics.connection_failures(), 2);
}

#[tokio::test]
async fn test_both_nodes_optimal() {
    let beacon = spawn_beacon(BeaconMock::default()).await;
    let execution = spawn_execution(ExecutionMock::default()).await;
    let config = test_config(beacon, execution);

    let (report, output, _) = probe(&config).await;

    assert!(report.healthy, "unexpected output:\n{}", output);
    assert_eq!(report.beacon.health(), NodeHealth::Optimal);
    assert_eq!(report.beacon.peer_count, Some(25));
    assert_eq!(report.beacon.peer_tier, Some(PeerTier::Excellent));
    assert_eq!(
        report.beacon.version.as_deref(),
        Some("Lighthouse/v5.3.0/x86_64-linux")
    );
    assert_eq!(report.beacon.head_slot, Some(4_812_346));
    assert!(report.beacon.issues.is_empty());

    assert_eq!(report.execution.health(), NodeHealth::Optimal);
    assert_eq!(report.execution.peer_count, Some(15));
    assert_eq!(report.execution.latest_block, Some(7_123_456));
    assert!(report.execution.block_age_secs.unwrap() < 60);
    assert!(report.execution.issues.is_empty());

    assert!(output.contains("Beacon Chain: OPTIMAL"));
    assert!(output.contains("Sepolia RPC: OPTIMAL"));
    assert!(output.contains("Latest block: 7,123,456"));
    assert!(output.contains("All systems healthy!"));
    assert!(!output.contains("IDENTIFIED ISSUES"));
}

#[tokio::test]
async fn test_wrong_network_and_low_peers() {
    let beacon = spawn_beacon(BeaconMock {
        peers: 4,
        ..Default::default()
    })
    .await;
    let execution = spawn_execution(ExecutionMock {
        chain_id: "0x1",
        peers: "0x1",
        ..Default::default()
    })
    .await;
    let config = test_config(beacon, execution);

    let (report, output, _) = probe(&config).await;

    assert_eq!(report.beacon.peer_tier, Some(PeerTier::Minimal));
    assert!(report
        .beacon
        .issues
        .contains(&"Low peer count may affect sync performance".to_string()));

    assert_eq!(report.execution.network, Some(NetworkIdentity::Mainnet));
    assert_eq!(report.execution.peer_tier, Some(PeerTier::Poor));
    assert!(report
        .execution
        .issues
        .contains(&"Wrong network - connected to mainnet".to_string()));
    assert!(report
        .execution
        .issues
        .contains(&"Very low peer count - check network connectivity".to_string()));

    assert!(output.contains("IDENTIFIED ISSUES"));
    assert!(!output.contains("QUICK FIXES"));
}

#[tokio::test]
async fn test_unknown_chain_id() {
    let beacon = spawn_beacon(BeaconMock::default()).await;
    let execution = spawn_execution(ExecutionMock {
        chain_id: "0x4268",
        ..Default::default()
    })
    .await;
    let config = test_config(beacon, execution);

    let (report, _, _) = probe(&config).await;

    assert_eq!(report.execution.network, Some(NetworkIdentity::Unknown(17000)));
    assert!(report
        .execution
        .issues
        .contains(&"Unknown network (Chain ID: 17000)".to_string()));
}

#[tokio::test]
async fn test_unhealthy_beacon_endpoint() {
    let beacon = spawn_beacon(BeaconMock {
        health: StatusCode::SERVICE_UNAVAILABLE,
        ..Default::default()
    })
    .await;
    let execution = spawn_execution(ExecutionMock::default()).await;
    let config = test_config(beacon, execution);

    let (report, output, _) = probe(&config).await;

    assert!(!report.healthy);
    assert!(report.beacon.reachable);
    assert!(!report.beacon.healthy);
    assert_eq!(report.beacon.health(), NodeHealth::Critical);
    assert_eq!(
        report.beacon.issues[0],
        "Health endpoint failed after 2 attempts"
    );
    assert!(report.beacon.issues[2].contains("HTTP 503"));
    assert!(report.beacon.peer_count.is_none());
    assert!(output.contains("Beacon health check failed"));
}

#[tokio::test]
async fn test_syncing_nodes_are_functional() {
    let beacon = spawn_beacon(BeaconMock {
        is_syncing: true,
        sync_distance: 320,
        ..Default::default()
    })
    .await;
    let execution = spawn_execution(ExecutionMock {
        syncing: json!({"startingBlock": "0x0", "currentBlock": "0x3e8", "highestBlock": "0x7d0"}),
        ..Default::default()
    })
    .await;
    let config = test_config(beacon, execution);

    let (report, output, _) = probe(&config).await;

    assert!(report.healthy);
    assert_eq!(report.beacon.health(), NodeHealth::Functional);
    assert_eq!(report.beacon.sync_distance, Some(320));
    assert_eq!(report.execution.health(), NodeHealth::Functional);
    assert_eq!(report.execution.blocks_behind, Some(1000));
    assert!(output.contains("Beacon node is syncing (320 slots behind)"));
    assert!(output.contains("Sepolia node is syncing (1,000 blocks behind)"));
}

#[tokio::test]
async fn test_stale_latest_block() {
    let beacon = spawn_beacon(BeaconMock::default()).await;
    let execution = spawn_execution(ExecutionMock {
        block_age_secs: 3_600,
        ..Default::default()
    })
    .await;
    let config = test_config(beacon, execution);

    let (report, _, _) = probe(&config).await;

    let age = report.execution.block_age_secs.unwrap();
    assert!(age >= 3_600);
    assert!(report
        .execution
        .issues
        .iter()
        .any(|i| i.ends_with("s old - node may be stalled")));
}

#[tokio::test]
async fn test_failed_block_queries_are_reported() {
    let beacon = spawn_beacon(BeaconMock {
        head: StatusCode::INTERNAL_SERVER_ERROR,
        ..Default::default()
    })
    .await;
    let execution = spawn_execution(ExecutionMock {
        peers: "0xa",
        failing: &["eth_blockNumber", "eth_getBlockByNumber"],
        ..Default::default()
    })
    .await;
    let config = test_config(beacon, execution);

    let (report, output, _) = probe(&config).await;

    assert!(report.healthy);
    assert!(report.execution.latest_block.is_none());
    assert!(report.execution.block_age_secs.is_none());
    assert!(output.contains("Latest block number unknown (2 attempts failed)"));
    assert!(output.contains("Latest block age unknown"));

    // head slot still comes from the syncing endpoint
    assert_eq!(report.beacon.head_slot, Some(4_812_345));
    assert!(output.contains("Head slot unknown"));
}

#[tokio::test]
async fn test_malformed_rpc_body_degrades() {
    let beacon = spawn_beacon(BeaconMock::default()).await;
    let execution = spawn_execution(ExecutionMock {
        malformed: true,
        ..Default::default()
    })
    .await;
    let config = test_config(beacon, execution);

    let (report, output, _) = probe(&config).await;

    assert!(!report.healthy);
    assert!(report.execution.reachable);
    assert!(!report.execution.responding);
    assert!(report.execution.chain_id.is_none());
    assert!(report.execution.peer_count.is_none());
    assert!(report.execution.synced.is_none());
    assert!(report.execution.issues[0].starts_with("RPC parsing error"));
    assert!(output.contains("Sync status unknown"));
    assert!(output.contains("Peer count unknown"));
}

#[tokio::test]
async fn test_invalid_urls() {
    let config = test_config(
        "http://localhost:notaport".to_string(),
        "".to_string(),
    );

    let (report, output, metrics) = probe(&config).await;

    assert!(!report.healthy);
    assert_eq!(report.beacon.issues, vec!["Invalid URL format"]);
    assert_eq!(report.execution.issues, vec!["Invalid URL format"]);
    assert!(output.contains("Invalid URL"));
    assert_eq!(metrics.connection_attempts(), 0);
}

#[tokio::test]
async fn test_metrics_file_written() {
    let beacon = spawn_beacon(BeaconMock::default()).await;
    let execution = spawn_execution(ExecutionMock::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ethprobe.prom");

    let mut config = test_config(beacon, execution);
    config.metrics_file = Some(path.clone());

    let (report, _, _) = probe(&config).await;
    assert!(report.healthy);

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("ethprobe_healthy_runs_total 1"));
    assert!(content.contains("ethprobe_beacon_peers 25"));
    assert!(content.contains("ethprobe_execution_peers 15"));
    assert!(content.contains("ethprobe_latest_block 7123456"));
}
