//! Network transport for JSON-RPC calls.
//!
//! The `Transport` trait is the seam between session handling and the wire.
//! `HttpTransport` is the production implementation over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use super::error::{TransportError, TransportErrorKind};
use crate::config::call_url;
use crate::models::{RpcEnvelope, RpcRequest, RpcResponse};

/// Performs one network call.
///
/// Implementations fail only for connectivity-level problems. Application
/// errors are returned in `RpcResponse::data.error`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: &str,
        server: &str,
        params: &Value,
        timeout: Option<Duration>,
    ) -> Result<RpcResponse, TransportError>;
}

/// JSON-RPC over HTTPS.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    /// Share an existing connection pool.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: &str,
        server: &str,
        params: &Value,
        timeout: Option<Duration>,
    ) -> Result<RpcResponse, TransportError> {
        let url = call_url(server);
        debug!(method = method, url = %url, "Sending JSON-RPC request");

        let mut request = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&RpcRequest { method, params });
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status, &body));
        }

        let text = response.text().await?;
        let data: RpcEnvelope = serde_json::from_str(&text).map_err(|e| {
            TransportError::new(
                TransportErrorKind::Decode,
                format!("Failed to parse JSON-RPC response from {}: {}", url, e),
            )
        })?;

        Ok(RpcResponse {
            status: status.as_u16(),
            data,
        })
    }
}
