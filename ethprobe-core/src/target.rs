//! Node URL parsing
//!
//! Extracts the host and port used for raw TCP probing, and the base URL
//! used for HTTP requests.

use crate::error::ProbeError;

pub const BEACON_DEFAULT_PORT: u16 = 5052;
pub const EXECUTION_DEFAULT_PORT: u16 = 8545;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    /// Scheme, host, optional port and path, without a trailing slash
    pub base_url: String,
}

impl Target {
    /// Join an API path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Parse a node URL.
///
/// With a scheme, an explicit port wins; otherwise `https` implies 443 and
/// any other scheme falls back to `default_port`. Without a scheme the input
/// is `host[:port]` and is served over plain HTTP.
pub fn parse_target(url: &str, default_port: u16) -> Result<Target, ProbeError> {
    let url = url.trim().trim_end_matches('/');
    let invalid = || ProbeError::InvalidUrl(url.to_string());

    if url.is_empty() {
        return Err(invalid());
    }

    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => ("http".to_string(), url),
    };

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    let (host, explicit_port) = split_authority(authority).ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }

    let port = match explicit_port {
        Some(port) => port,
        None if scheme == "https" => 443,
        None => default_port,
    };

    // HTTP must reach the same port the TCP probe uses
    let base_url = if explicit_port.is_some() || scheme == "https" {
        format!("{}://{}{}", scheme, authority, path)
    } else {
        format!("{}://{}:{}{}", scheme, host, port, path)
    };

    Ok(Target {
        host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
        port,
        base_url,
    })
}

/// Split `host[:port]`, keeping bracketed IPv6 literals intact
fn split_authority(authority: &str) -> Option<(&str, Option<u16>)> {
    if authority.starts_with('[') {
        let end = authority.find(']')?;
        let host = &authority[..=end];
        return match &authority[end + 1..] {
            "" => Some((host, None)),
            rest => {
                let port = rest.strip_prefix(':')?.parse().ok()?;
                Some((host, Some(port)))
            }
        };
    }

    match authority.split_once(':') {
        Some((host, port)) => Some((host, Some(port.parse().ok()?))),
        None => Some((authority, None)),
    }
}
