//! Log source abstraction for fetching raw chain logs.

use crate::domain::Address;
use async_trait::async_trait;
use ethabi::ethereum_types::H256;
use serde::Deserialize;
use std::fmt;

pub mod ethereum;
pub mod mock;

pub use ethereum::EthereumLogSource;
pub use mock::MockLogSource;

/// A log as returned by the chain, before routing and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
    pub block_hash: H256,
    pub block_number: u64,
    pub transaction_hash: H256,
    pub log_index: u64,
}

impl RawLog {
    /// Topic at `index`, or the zero word when the log carries fewer topics.
    pub fn topic(&self, index: usize) -> H256 {
        self.topics.get(index).copied().unwrap_or_else(H256::zero)
    }
}

/// Log source trait for polling chain history.
///
/// Implementations must handle retry/backoff and rate limiting.
#[async_trait]
pub trait LogSource: Send + Sync + fmt::Debug {
    /// Current head block number.
    async fn latest_block(&self) -> Result<u64, DataSourceError>;

    /// Fetch logs in `[from_block, to_block]` whose first topic is any of `topics`.
    ///
    /// # Returns
    /// Logs ordered by (block_number, log_index)
    async fn fetch_logs(
        &self,
        from_block: u64,
        to_block: u64,
        topics: &[H256],
    ) -> Result<Vec<RawLog>, DataSourceError>;
}

/// Error type for log source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// JSON-RPC error object returned by the node
    RpcError { code: i64, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::RpcError { code, message } => {
                write!(f, "RPC error {}: {}", code, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for DataSourceError {}

/// A log in the JSON-RPC wire format (`eth_getLogs` result element).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_hash: String,
    pub block_number: String,
    pub transaction_hash: String,
    pub log_index: String,
}

impl TryFrom<WireLog> for RawLog {
    type Error = DataSourceError;

    fn try_from(wire: WireLog) -> Result<Self, Self::Error> {
        let address = Address::parse(&wire.address)
            .map_err(|e| DataSourceError::ParseError(e.to_string()))?;
        let topics = wire
            .topics
            .iter()
            .map(|t| parse_h256(t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RawLog {
            address,
            topics,
            data: parse_bytes(&wire.data)?,
            block_hash: parse_h256(&wire.block_hash)?,
            block_number: parse_quantity(&wire.block_number)?,
            transaction_hash: parse_h256(&wire.transaction_hash)?,
            log_index: parse_quantity(&wire.log_index)?,
        })
    }
}

/// Parse a hex quantity such as `0xa5a3`.
pub fn parse_quantity(s: &str) -> Result<u64, DataSourceError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| DataSourceError::ParseError(format!("bad quantity {:?}: {}", s, e)))
}

fn parse_bytes(s: &str) -> Result<Vec<u8>, DataSourceError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| DataSourceError::ParseError(format!("bad hex data: {}", e)))
}

fn parse_h256(s: &str) -> Result<H256, DataSourceError> {
    let bytes = parse_bytes(s)?;
    if bytes.len() != 32 {
        return Err(DataSourceError::ParseError(format!(
            "expected 32 byte word, got {} bytes",
            bytes.len()
        )));
    }
    Ok(H256::from_slice(&bytes))
}
