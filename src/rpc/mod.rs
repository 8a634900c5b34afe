//! Batched JSON-RPC calls for on-chain position lookups.
//!
//! Each request carries a correlation key in its `id` field instead of a
//! sequence number, so responses can be matched back in any order.

use crate::domain::{Address, Number};
use ethabi::ethereum_types::U256;
use ethabi::Token;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod batch;
pub mod mock;
pub mod transport;

pub use batch::{BatchConfig, BatchRpcClient};
pub use mock::MockTransport;
pub use transport::{HttpTransport, RpcTransport};

/// Selector of `positionLiquidity8D11C045(address,uint256)`.
pub const POSITION_LIQUIDITY_SELECTOR: [u8; 4] = [0x00, 0x00, 0x02, 0x5b];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: serde_json::Value,
}

impl RpcRequest {
    /// An `eth_call` against the latest block.
    pub fn eth_call(key: String, to: &Address, data: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: key,
            method: "eth_call".to_string(),
            params: serde_json::json!([{ "to": to.as_str(), "data": data }, "latest"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// A decoded response, still tagged with the caller's correlation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub key: String,
    pub value: Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("request: {0}")]
    Transport(String),

    #[error("bad response status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decoding response: {0}")]
    Decode(String),

    #[error("error reported for {key}: {error}")]
    Remote { key: String, error: String },

    #[error("unpacking result for {key}: {value:?}")]
    MalformedResult { key: String, value: String },

    #[error("position id {0} cannot be encoded")]
    InvalidPositionId(i64),

    #[error("batch cancelled")]
    Cancelled,

    #[error("result for unrequested or already answered key {key}")]
    UnexpectedKey { key: String },

    #[error("workers stopped after {received} of {expected} results")]
    MissingResults { received: usize, expected: usize },
}

impl RpcResponse {
    /// Turn a wire response into a correlated result.
    ///
    /// A non-null `error` or a result that is not a hex quantity fails the item.
    pub fn into_result(self) -> Result<CallResult, RpcError> {
        if let Some(error) = self.error {
            return Err(RpcError::Remote {
                key: self.id,
                error: error.to_string(),
            });
        }
        let raw = self.result.unwrap_or_default();
        match Number::from_hex(&raw) {
            Some(value) => Ok(CallResult { key: self.id, value }),
            None => Err(RpcError::MalformedResult {
                key: self.id,
                value: raw,
            }),
        }
    }
}

/// Calldata asking the AMM for a position's current liquidity.
///
/// The selector is followed by the pool and the id, each left-padded to 32 bytes.
pub fn position_liquidity_calldata(pool: &Address, id: i64) -> Result<String, RpcError> {
    let id = u64::try_from(id).map_err(|_| RpcError::InvalidPositionId(id))?;
    let mut data = POSITION_LIQUIDITY_SELECTOR.to_vec();
    data.extend(ethabi::encode(&[
        Token::Address(pool.to_h160()),
        Token::Uint(U256::from(id)),
    ]));
    Ok(format!("0x{}", hex::encode(data)))
}

/// Correlation key: the pool address followed by the id in lowercase hex.
pub fn encode_key(pool: &Address, id: i64) -> String {
    format!("{}{:x}", pool, id)
}

/// Split a correlation key back into its pool and id.
pub fn decode_key(key: &str) -> Option<(Address, i64)> {
    if key.len() <= 42 || !key.is_char_boundary(42) {
        return None;
    }
    let (pool, id) = key.split_at(42);
    let pool = Address::parse(pool).ok()?;
    let id = i64::from_str_radix(id, 16).ok()?;
    Some((pool, id))
}
