//! Domain types shared by the ingestion and snapshot pipelines.
//!
//! This module provides:
//! - Lossless numeric handling via the `Number` wrapper
//! - Chain primitives: TimeMs, Address, Hash, Data
//! - Position read models and the snapshot output row

pub mod number;
pub mod position;
pub mod primitives;

pub use number::Number;
pub use position::{PoolDetail, Position, PositionSnapshot};
pub use primitives::{Address, AddressParseError, Data, Hash, TimeMs};
