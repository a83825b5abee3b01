//! Minimal JSON-RPC 2.0 client for execution nodes

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::request::{RequestOutcome, RetryingClient};

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Vec<Value>,
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(method: &'a str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// Result of one JSON-RPC call made through the retrying client
#[derive(Debug, Clone)]
pub enum RpcReply {
    /// The node returned a `result` value (possibly `false` or an object)
    Result(Value),
    /// HTTP 200 but the body was not a usable JSON-RPC response
    Malformed(String),
    /// Every attempt failed at the HTTP level
    Failed,
}

impl RpcReply {
    pub fn result(&self) -> Option<&Value> {
        match self {
            RpcReply::Result(value) => Some(value),
            _ => None,
        }
    }

    pub fn responded(&self) -> bool {
        !matches!(self, RpcReply::Failed)
    }
}

pub struct RpcClient {
    http: RetryingClient,
    url: String,
}

impl RpcClient {
    pub fn new(http: RetryingClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> (RpcReply, RequestOutcome) {
        let body = match serde_json::to_value(JsonRpcRequest::new(method, params)) {
            Ok(body) => body,
            Err(e) => return (RpcReply::Malformed(e.to_string()), RequestOutcome::default()),
        };

        let (response, outcome) = self.http.post_json(&self.url, &body).await;
        let Some(response) = response else {
            return (RpcReply::Failed, outcome);
        };

        let reply = match response.json::<JsonRpcResponse>() {
            Ok(JsonRpcResponse {
                error: Some(error), ..
            }) => {
                warn!("{} returned JSON-RPC error {}: {}", method, error.code, error.message);
                RpcReply::Malformed(format!("JSON-RPC error {}: {}", error.code, error.message))
            }
            Ok(JsonRpcResponse {
                result: Some(result),
                ..
            }) => RpcReply::Result(result),
            Ok(_) => RpcReply::Malformed("response has no result field".to_string()),
            Err(e) => {
                warn!("{} returned an unparseable body: {}", method, e);
                RpcReply::Malformed(format!("invalid JSON: {}", e))
            }
        };

        (reply, outcome)
    }
}

/// Parse a hex quantity such as `"0xaa36a7"`
pub fn parse_quantity(value: &str) -> Option<u64> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Read a hex quantity out of a JSON value
pub fn quantity(value: &Value) -> Option<u64> {
    value.as_str().and_then(parse_quantity)
}
