//! Read models consumed by the snapshot reconciler.

use super::number::Number;
use super::primitives::Address;
use serde::{Deserialize, Serialize};

/// An open liquidity position, derived from replayed mint/burn/transfer events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub pool: Address,
    pub id: i64,
    pub owner: Address,
    pub lower: i32,
    pub upper: i32,
}

/// Latest known price tick and decimal scale of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDetail {
    pub pool: Address,
    pub final_tick: i32,
    pub decimals: u8,
}

/// Token composition of a position at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub pool: Address,
    pub id: i64,
    pub amount0: Number,
    pub amount1: Number,
}

impl PositionSnapshot {
    /// Snapshots with nothing in either token are not persisted.
    pub fn is_empty(&self) -> bool {
        self.amount0.is_zero() && self.amount1.is_zero()
    }
}
