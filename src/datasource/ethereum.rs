//! JSON-RPC log source for an Ethereum-compatible node.

use super::{parse_quantity, DataSourceError, LogSource, RawLog, WireLog};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use ethabi::ethereum_types::H256;
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Log source backed by `eth_blockNumber` and `eth_getLogs`.
#[derive(Debug)]
pub struct EthereumLogSource {
    client: Client,
    url: String,
    next_id: AtomicU64,
    retry_window: Duration,
}

#[derive(Debug, Deserialize)]
struct RpcReply {
    result: Option<serde_json::Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl EthereumLogSource {
    /// Create a new log source for the given node URL.
    ///
    /// Every HTTP attempt is bounded by `timeout`; retries stop after 30 seconds.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: String, timeout: Duration) -> Result<Self, DataSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataSourceError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
            retry_window: Duration::from_secs(30),
        })
    }

    /// Stop retrying transient failures once `window` has elapsed.
    pub fn with_retry_window(mut self, window: Duration) -> Self {
        self.retry_window = window;
        self
    }

    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, DataSourceError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.retry_window),
            ..Default::default()
        };

        let reply = retry(backoff, || async {
            let response = self
                .client
                .post(&self.url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<RpcReply>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await?;

        if let Some(err) = reply.error {
            return Err(DataSourceError::RpcError {
                code: err.code,
                message: err.message,
            });
        }
        reply
            .result
            .ok_or_else(|| DataSourceError::ParseError(format!("{} returned no result", method)))
    }
}

#[async_trait]
impl LogSource for EthereumLogSource {
    async fn latest_block(&self) -> Result<u64, DataSourceError> {
        let result = self.call("eth_blockNumber", serde_json::json!([])).await?;
        let quantity = result
            .as_str()
            .ok_or_else(|| DataSourceError::ParseError("Expected hex string".to_string()))?;
        parse_quantity(quantity)
    }

    async fn fetch_logs(
        &self,
        from_block: u64,
        to_block: u64,
        topics: &[H256],
    ) -> Result<Vec<RawLog>, DataSourceError> {
        debug!(from_block, to_block, topics = topics.len(), "Fetching logs");

        let topic_filter: Vec<String> = topics
            .iter()
            .map(|t| format!("0x{}", hex::encode(t.as_bytes())))
            .collect();
        let params = serde_json::json!([{
            "fromBlock": format!("0x{:x}", from_block),
            "toBlock": format!("0x{:x}", to_block),
            "topics": [topic_filter],
        }]);

        let result = self.call("eth_getLogs", params).await?;
        let wire: Vec<WireLog> = serde_json::from_value(result)
            .map_err(|e| DataSourceError::ParseError(e.to_string()))?;

        let mut logs = wire
            .into_iter()
            .map(RawLog::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        logs.sort_by_key(|l| (l.block_number, l.log_index));
        Ok(logs)
    }
}
