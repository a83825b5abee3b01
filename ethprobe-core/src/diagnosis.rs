//! Severity classification of TCP probe results
//!
//! A fixed decision table over success rate and mean latency:
//!
//! | successes | condition                             | severity   |
//! |-----------|---------------------------------------|------------|
//! | none      | mean >= timeout * timeout_fraction    | `Critical` |
//! | none      | mean > overload_latency_ms            | `Critical` |
//! | none      | otherwise                             | `Error`    |
//! | some      | success rate < 100%                   | `Warning`  |
//! | all       | mean > high_latency_ms                | `Warning`  |
//! | all       | otherwise                             | `Success`  |

use std::fmt;
use std::time::Duration;

use crate::connection::ConnectionAttempt;
use crate::thresholds::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Success,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub severity: Severity,
    pub details: Vec<String>,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Classify the attempts made against `port` with the given connect timeout.
pub fn classify(
    attempts: &[ConnectionAttempt],
    port: u16,
    connect_timeout: Duration,
    thresholds: &Thresholds,
) -> Diagnosis {
    if attempts.is_empty() {
        return Diagnosis {
            severity: Severity::Error,
            details: vec!["No connection attempts were made".to_string()],
        };
    }

    let (successful, failed): (Vec<&ConnectionAttempt>, Vec<&ConnectionAttempt>) =
        attempts.iter().partition(|a| a.success);

    if successful.is_empty() {
        let avg_latency = mean(failed.iter().map(|a| a.latency_ms));
        let timeout_ms = connect_timeout.as_secs_f64() * 1000.0;

        if avg_latency >= timeout_ms * thresholds.timeout_fraction {
            return Diagnosis {
                severity: Severity::Critical,
                details: vec![
                    "Connection timeout - service likely not running or severely overloaded"
                        .to_string(),
                    format!(
                        "Average timeout: {:.0}ms (limit: {:.0}ms)",
                        avg_latency, timeout_ms
                    ),
                    "Check: sudo systemctl status [service-name]".to_string(),
                    format!("Check: sudo netstat -tlnp | grep {}", port),
                ],
            };
        }

        if avg_latency > thresholds.overload_latency_ms {
            return Diagnosis {
                severity: Severity::Critical,
                details: vec![
                    "Severe network or system overload".to_string(),
                    format!("Connection failed after {:.0}ms on average", avg_latency),
                    "Check: System load and network path to the node".to_string(),
                ],
            };
        }

        let mut details = vec![
            "Port closed or service not responding".to_string(),
            format!("Connection refused after {:.0}ms", avg_latency),
        ];
        if let Some(reason) = failed.last().and_then(|a| a.error.as_ref()) {
            details.push(format!("Last error: {}", reason));
        }
        details.push(format!("Check: sudo ufw status (firewall on port {})", port));
        details.push("Check: Service configuration and binding address".to_string());

        return Diagnosis {
            severity: Severity::Error,
            details,
        };
    }

    let success_rate = successful.len() as f64 / attempts.len() as f64 * 100.0;
    let avg_latency = mean(successful.iter().map(|a| a.latency_ms));

    if successful.len() < attempts.len() {
        Diagnosis {
            severity: Severity::Warning,
            details: vec![
                format!("Intermittent connectivity ({:.0}% success rate)", success_rate),
                format!("Average latency: {:.0}ms", avg_latency),
                "Check: Network stability and system load".to_string(),
            ],
        }
    } else if avg_latency > thresholds.high_latency_ms {
        Diagnosis {
            severity: Severity::Warning,
            details: vec![
                "High latency detected".to_string(),
                format!("Average response time: {:.0}ms", avg_latency),
                "Consider: Hardware upgrade if consistently slow".to_string(),
            ],
        }
    } else {
        Diagnosis {
            severity: Severity::Success,
            details: vec![format!("Connection stable (latency: {:.0}ms)", avg_latency)],
        }
    }
}
