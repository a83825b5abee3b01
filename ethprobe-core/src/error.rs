//! Error types for probe startup and I/O
//!
//! Network and protocol failures are not errors here: they are recorded in
//! [`ConnectionAttempt`](crate::connection::ConnectionAttempt) and
//! [`RequestOutcome`](crate::request::RequestOutcome) and reported as issues.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
