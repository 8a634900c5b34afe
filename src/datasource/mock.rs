//! Mock log source for testing without network calls.

use super::{DataSourceError, LogSource, RawLog};
use async_trait::async_trait;
use ethabi::ethereum_types::H256;
use std::sync::Mutex;

/// Mock log source that serves predefined logs up to a fixed head.
#[derive(Debug, Default)]
pub struct MockLogSource {
    head: u64,
    logs: Vec<RawLog>,
    fail_with: Option<DataSourceError>,
    requests: Mutex<Vec<(u64, u64)>>,
}

impl MockLogSource {
    /// Create a new mock log source with an empty chain at `head`.
    pub fn new(head: u64) -> Self {
        Self {
            head,
            ..Default::default()
        }
    }

    /// Add a log to the mock chain.
    pub fn with_log(mut self, log: RawLog) -> Self {
        self.logs.push(log);
        self
    }

    /// Add multiple logs to the mock chain.
    pub fn with_logs(mut self, logs: Vec<RawLog>) -> Self {
        self.logs.extend(logs);
        self
    }

    /// Make every fetch fail with the given error.
    pub fn with_error(mut self, err: DataSourceError) -> Self {
        self.fail_with = Some(err);
        self
    }

    /// Ranges requested so far, in call order.
    pub fn requested_ranges(&self) -> Vec<(u64, u64)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn latest_block(&self) -> Result<u64, DataSourceError> {
        Ok(self.head)
    }

    async fn fetch_logs(
        &self,
        from_block: u64,
        to_block: u64,
        topics: &[H256],
    ) -> Result<Vec<RawLog>, DataSourceError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((from_block, to_block));
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }

        let mut logs: Vec<RawLog> = self
            .logs
            .iter()
            .filter(|l| {
                l.block_number >= from_block
                    && l.block_number <= to_block
                    && l.topics.first().map_or(false, |t| topics.contains(t))
            })
            .cloned()
            .collect();
        logs.sort_by_key(|l| (l.block_number, l.log_index));
        Ok(logs)
    }
}
