//! Threshold tables for latency, peer connectivity and block freshness
//!
//! Every number here is a configuration default. Deployments with other
//! expectations override them through the `[thresholds]` config table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Peer-count boundaries, each inclusive lower bound of its tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerTiers {
    pub excellent: u64,
    pub good: u64,
    pub minimal: u64,
}

/// Connectivity quality derived from a peer count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PeerTier {
    Poor,
    Minimal,
    Good,
    Excellent,
}

impl PeerTiers {
    pub const BEACON: PeerTiers = PeerTiers {
        excellent: 20,
        good: 10,
        minimal: 3,
    };

    pub const EXECUTION: PeerTiers = PeerTiers {
        excellent: 50,
        good: 10,
        minimal: 3,
    };

    pub fn classify(&self, peers: u64) -> PeerTier {
        if peers >= self.excellent {
            PeerTier::Excellent
        } else if peers >= self.good {
            PeerTier::Good
        } else if peers >= self.minimal {
            PeerTier::Minimal
        } else {
            PeerTier::Poor
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.excellent < self.good || self.good < self.minimal {
            return Err(format!(
                "tiers must satisfy excellent >= good >= minimal (got {}/{}/{})",
                self.excellent, self.good, self.minimal
            ));
        }
        Ok(())
    }
}

impl PeerTier {
    pub fn label(&self) -> &'static str {
        match self {
            PeerTier::Excellent => "Excellent",
            PeerTier::Good => "Good",
            PeerTier::Minimal => "Minimal",
            PeerTier::Poor => "Poor",
        }
    }

    /// Issue recorded against the node for this tier, if any
    pub fn issue(&self) -> Option<&'static str> {
        match self {
            PeerTier::Excellent | PeerTier::Good => None,
            PeerTier::Minimal => Some("Low peer count may affect sync performance"),
            PeerTier::Poor => Some("Very low peer count - check network connectivity"),
        }
    }
}

impl fmt::Display for PeerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which network a reported chain id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkIdentity {
    Expected,
    Mainnet,
    Unknown(u64),
}

pub const MAINNET_CHAIN_ID: u64 = 1;

impl NetworkIdentity {
    pub fn from_chain_id(chain_id: u64, expected: u64) -> Self {
        if chain_id == expected {
            NetworkIdentity::Expected
        } else if chain_id == MAINNET_CHAIN_ID {
            NetworkIdentity::Mainnet
        } else {
            NetworkIdentity::Unknown(chain_id)
        }
    }

    pub fn issue(&self) -> Option<String> {
        match self {
            NetworkIdentity::Expected => None,
            NetworkIdentity::Mainnet => Some("Wrong network - connected to mainnet".to_string()),
            NetworkIdentity::Unknown(id) => Some(format!("Unknown network (Chain ID: {})", id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Failed attempts averaging at least this share of the timeout are treated as timeouts
    pub timeout_fraction: f64,
    pub overload_latency_ms: f64,
    pub high_latency_ms: f64,
    /// Pause after each successful TCP connect
    pub connect_pacing_ms: u64,
    /// Pause between HTTP request attempts
    pub retry_delay_ms: u64,
    pub beacon_peers: PeerTiers,
    pub execution_peers: PeerTiers,
    pub max_block_age_secs: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            timeout_fraction: 0.9,
            overload_latency_ms: 5000.0,
            high_latency_ms: 1000.0,
            connect_pacing_ms: 100,
            retry_delay_ms: 500,
            beacon_peers: PeerTiers::BEACON,
            execution_peers: PeerTiers::EXECUTION,
            max_block_age_secs: 120,
        }
    }
}

impl Thresholds {
    pub fn connect_pacing(&self) -> Duration {
        Duration::from_millis(self.connect_pacing_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
