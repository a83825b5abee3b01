//! Ethprobe Core
//!
//! TCP probing, retrying HTTP requests and health classification for an
//! Ethereum beacon node and its execution-layer JSON-RPC node.

pub mod beacon;
pub mod checker;
pub mod config;
pub mod connection;
pub mod diagnosis;
pub mod error;
pub mod execution;
pub mod metrics;
pub mod report;
pub mod request;
pub mod rpc;
pub mod runtime;
pub mod target;
pub mod thresholds;

pub use beacon::BeaconStatus;
pub use checker::{ConnectionReport, HealthChecker};
pub use config::{Config, ConfigError, NetworkConfig};
pub use connection::{probe, ConnectionAttempt};
pub use diagnosis::{classify, Diagnosis, Severity};
pub use error::ProbeError;
pub use execution::{ExecutionStatus, SyncState};
pub use metrics::Metrics;
pub use report::{NodeHealth, Palette, Reporter, Status};
pub use request::{HttpResponse, Method, RequestOutcome, RetryingClient};
pub use rpc::{parse_quantity, RpcClient, RpcReply};
pub use runtime::{run, run_once, ProbeReport, RunOutcome};
pub use target::{parse_target, Target};
pub use thresholds::{NetworkIdentity, PeerTier, PeerTiers, Thresholds};
