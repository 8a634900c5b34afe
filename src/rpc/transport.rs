//! Network transport for batched JSON-RPC requests.

use super::{RpcError, RpcRequest, RpcResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// Sends one JSON array of requests and returns the matching array of responses.
///
/// Callers drop the returned future to cancel an in-flight call.
#[async_trait]
pub trait RpcTransport: Send + Sync + fmt::Debug {
    async fn send_batch(&self, batch: &[RpcRequest]) -> Result<Vec<RpcResponse>, RpcError>;
}

/// HTTP POST transport with a per-request deadline.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: String, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send_batch(&self, batch: &[RpcRequest]) -> Result<Vec<RpcResponse>, RpcError> {
        let response = self
            .client
            .post(&self.url)
            .json(batch)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<RpcResponse>>()
            .await
            .map_err(|e| RpcError::Decode(e.to_string()))
    }
}
