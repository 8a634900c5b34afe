//! Domain primitives: TimeMs, Address, Hash, Data.

use ethabi::ethereum_types::{H160, H256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address {0:?}: expected 0x followed by 40 hex digits")]
pub struct AddressParseError(pub String);

/// Contract or wallet address, always stored lowercase with a 0x prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Parse and normalise a hex address.
    ///
    /// # Errors
    /// Returns an error unless the input is `0x` followed by exactly 40 hex digits.
    pub fn parse(s: &str) -> Result<Self, AddressParseError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError(s.to_string()))?;
        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError(s.to_string()));
        }
        Ok(Address(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// The all-zero address.
    pub fn zero() -> Self {
        Address::from(H160::zero())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 20 raw bytes of the address.
    pub fn to_h160(&self) -> H160 {
        let mut bytes = [0u8; 20];
        // Construction guarantees 40 valid hex digits after the prefix.
        if hex::decode_to_slice(&self.0[2..], &mut bytes).is_err() {
            return H160::zero();
        }
        H160::from(bytes)
    }

    /// Take the low 20 bytes of a 32-byte topic word.
    pub fn from_topic(topic: &H256) -> Self {
        Address::from(H160::from_slice(&topic.as_bytes()[12..]))
    }
}

impl Default for Address {
    fn default() -> Self {
        Address::zero()
    }
}

impl From<H160> for Address {
    fn from(value: H160) -> Self {
        Address(format!("0x{}", hex::encode(value.as_bytes())))
    }
}

impl std::str::FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block or transaction hash (lowercase 0x-prefixed hex).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(String);

impl Hash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<H256> for Hash {
    fn from(value: H256) -> Self {
        Hash(format!("0x{}", hex::encode(value.as_bytes())))
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arbitrary byte string rendered as lowercase 0x-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Data(String);

impl Data {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Data(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
