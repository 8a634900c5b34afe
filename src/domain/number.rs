//! Lossless arbitrary-precision integer backed by num-bigint.
//!
//! On-chain quantities (token amounts, liquidity, 256-bit topic values) do not fit
//! in machine integers, so they travel through the system as `Number` and are
//! persisted as canonical base-10 strings.

use ethabi::ethereum_types::U256;
use num_bigint::{BigInt, BigUint, ParseBigIntError, Sign};
use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Arbitrary-precision signed integer.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Number(BigInt);

impl Number {
    pub fn new(value: BigInt) -> Self {
        Number(value)
    }

    /// Parse a base-10 string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid integer.
    pub fn from_str_canonical(s: &str) -> Result<Self, ParseBigIntError> {
        BigInt::from_str(s.trim()).map(Number)
    }

    /// Parse a big-endian hex string with or without a `0x` prefix.
    ///
    /// An empty payload is rejected rather than read as zero.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() {
            return None;
        }
        BigUint::parse_bytes(digits.as_bytes(), 16).map(|v| Number(BigInt::from(v)))
    }

    /// Interpret a 256-bit word as an unsigned integer.
    pub fn from_u256(value: U256) -> Self {
        let mut buf = [0u8; 32];
        value.to_big_endian(&mut buf);
        Number(BigInt::from_bytes_be(Sign::Plus, &buf))
    }

    /// Interpret a 256-bit word as a two's complement signed integer.
    pub fn from_i256(value: U256) -> Self {
        if value.bit(255) {
            let magnitude = (!value).overflowing_add(U256::one()).0;
            Number(-Number::from_u256(magnitude).0)
        } else {
            Number::from_u256(value)
        }
    }

    /// Format as a canonical base-10 string.
    pub fn to_canonical_string(&self) -> String {
        self.0.to_str_radix(10)
    }

    pub fn inner(&self) -> &BigInt {
        &self.0
    }

    pub fn into_inner(self) -> BigInt {
        self.0
    }

    /// Magnitude as an unsigned integer, or None when negative.
    pub fn to_biguint(&self) -> Option<BigUint> {
        self.0.to_biguint()
    }

    pub fn zero() -> Self {
        Number(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Render `self / 10^decimals` as an exact decimal string for display.
    pub fn scale_str(&self, decimals: u32) -> String {
        if decimals == 0 {
            return self.to_canonical_string();
        }
        let digits = self.0.abs().to_str_radix(10);
        let width = decimals as usize;
        let padded = if digits.len() <= width {
            format!("{}{}", "0".repeat(width + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (whole, frac) = padded.split_at(padded.len() - width);
        let sign = if self.0.is_negative() { "-" } else { "" };
        format!("{}{}.{}", sign, whole, frac)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Number {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<BigInt> for Number {
    fn from(value: BigInt) -> Self {
        Number(value)
    }
}

impl From<BigUint> for Number {
    fn from(value: BigUint) -> Self {
        Number(BigInt::from(value))
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number(BigInt::from(value))
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Number::from_str_canonical(&s).map_err(serde::de::Error::custom)
    }
}
