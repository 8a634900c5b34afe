//! Scripted transport for testing batch execution.

use super::{RpcError, RpcRequest, RpcResponse, RpcTransport};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Answers each request from a table of canned results.
///
/// Keys without a canned result answer `0x0`.
#[derive(Debug, Default)]
pub struct MockTransport {
    results: HashMap<String, String>,
    failing_keys: HashSet<String>,
    transport_error: Option<RpcError>,
    stall: bool,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `key` with the given hex result.
    pub fn with_result(mut self, key: impl Into<String>, result: impl Into<String>) -> Self {
        self.results.insert(key.into(), result.into());
        self
    }

    /// Answer `key` with a JSON-RPC error object.
    pub fn with_remote_error(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    /// Fail every call before any response is produced.
    pub fn with_transport_error(mut self, error: RpcError) -> Self {
        self.transport_error = Some(error);
        self
    }

    /// Never answer.
    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }

    /// Sizes of every batch received so far.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .map(|sizes| sizes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn send_batch(&self, batch: &[RpcRequest]) -> Result<Vec<RpcResponse>, RpcError> {
        if let Ok(mut sizes) = self.batch_sizes.lock() {
            sizes.push(batch.len());
        }
        if self.stall {
            std::future::pending::<()>().await;
        }
        if let Some(err) = &self.transport_error {
            return Err(err.clone());
        }

        Ok(batch
            .iter()
            .map(|req| {
                if self.failing_keys.contains(&req.id) {
                    RpcResponse {
                        id: req.id.clone(),
                        result: None,
                        error: Some(serde_json::json!({
                            "code": -32000,
                            "message": "execution reverted",
                        })),
                    }
                } else {
                    RpcResponse {
                        id: req.id.clone(),
                        result: Some(
                            self.results
                                .get(&req.id)
                                .cloned()
                                .unwrap_or_else(|| "0x0".to_string()),
                        ),
                        error: None,
                    }
                }
            })
            .collect())
    }
}
