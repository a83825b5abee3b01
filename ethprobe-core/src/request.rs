//! HTTP requests with bounded retries
//!
//! Each logical check goes through [`RetryingClient::request_with_retry`],
//! which stops at the first `200 OK` and otherwise records every failure.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

use crate::connection::elapsed_ms;
use crate::error::ProbeError;
use crate::metrics::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A response that completed with status 200
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Timing and error record of one logical request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOutcome {
    pub latencies: Vec<f64>,
    pub average_latency: f64,
    pub attempt_count: u32,
    pub errors: Vec<String>,
}

impl RequestOutcome {
    fn finish(latencies: Vec<f64>, errors: Vec<String>) -> Self {
        let average_latency = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };
        Self {
            attempt_count: latencies.len() as u32,
            latencies,
            average_latency,
            errors,
        }
    }
}

#[derive(Clone)]
pub struct RetryingClient {
    client: reqwest::Client,
    retries: u32,
    retry_delay: Duration,
    metrics: Metrics,
}

impl RetryingClient {
    pub fn new(
        timeout: Duration,
        retries: u32,
        retry_delay: Duration,
        metrics: Metrics,
    ) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            retries,
            retry_delay,
            metrics,
        })
    }

    pub async fn get(&self, url: &str) -> (Option<HttpResponse>, RequestOutcome) {
        self.request_with_retry(Method::Get, url, None).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> (Option<HttpResponse>, RequestOutcome) {
        self.request_with_retry(Method::Post, url, Some(body)).await
    }

    /// Issue the request up to `retries` times.
    ///
    /// Returns the first `200 OK` response. Any other status, transport error
    /// or unreadable body is recorded and retried after `retry_delay`. When
    /// every attempt fails the response is `None`.
    pub async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> (Option<HttpResponse>, RequestOutcome) {
        let mut latencies = Vec::with_capacity(self.retries as usize);
        let mut errors = Vec::new();

        for attempt in 1..=self.retries {
            let start = Instant::now();
            let result = self.send_once(method, url, body).await;
            latencies.push(elapsed_ms(start));
            self.metrics.request_attempted();

            match result {
                Ok(response) if response.status == 200 => {
                    debug!("{:?} {} succeeded on attempt {}", method, url, attempt);
                    return (Some(response), RequestOutcome::finish(latencies, errors));
                }
                Ok(response) => {
                    debug!("{:?} {} attempt {}: HTTP {}", method, url, attempt, response.status);
                    errors.push(format!("HTTP {}", response.status));
                }
                Err(e) => {
                    debug!("{:?} {} attempt {}: {}", method, url, attempt, e);
                    errors.push(e.to_string());
                }
            }

            self.metrics.request_failed();
            if attempt < self.retries {
                sleep(self.retry_delay).await;
            }
        }

        (None, RequestOutcome::finish(latencies, errors))
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse, reqwest::Error> {
        let mut request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}
