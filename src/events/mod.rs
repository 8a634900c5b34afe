//! Event decoders turning raw chain logs into typed, provenance-tagged records.
//!
//! This module provides:
//! - Embedded ABI loading (`EventAbis`)
//! - The shared `Provenance` block and the `DecodedEvent` tagged union
//! - Typed parameter extraction helpers used by every decoder
//! - `router`, mapping a log's first topic to its decoder and destination table

use crate::datasource::RawLog;
use crate::domain::{Address, Hash, TimeMs};
use ethabi::ethereum_types::{H256, U256};
use ethabi::{Contract, Event, LogParam, Token};
use serde::Serialize;
use thiserror::Error;

pub mod erc20;
pub mod leo;
pub mod router;
pub mod seawater;
pub mod thirdweb;

pub use router::{EmitterRule, Route, RouteOutcome, TopicRouter, TrackedContracts};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("failed to load ABI: {0}")]
    Abi(String),
    #[error("bad {field}: expected {expected}, got {actual}")]
    UnexpectedType {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },
    #[error("{field} out of range: {value}")]
    ValueOutOfRange { field: &'static str, value: String },
    #[error("missing parameter {0}")]
    MissingParam(&'static str),
    #[error("unexpected topic: 0x{}", hex::encode(.0.as_bytes()))]
    UnknownTopic(H256),
    #[error("log has no topics")]
    EmptyTopics,
}

impl From<ethabi::Error> for DecodeError {
    fn from(err: ethabi::Error) -> Self {
        DecodeError::UnexpectedType {
            field: "log",
            expected: "well-formed ABI payload",
            actual: err.to_string(),
        }
    }
}

/// Common provenance fields carried by every decoded event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Assigned by storage on insert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<TimeMs>,
    pub block_hash: Hash,
    pub transaction_hash: Hash,
    pub block_number: u64,
    pub emitter_addr: Address,
}

impl Provenance {
    pub fn from_log(log: &RawLog) -> Self {
        Provenance {
            created_by: None,
            block_hash: Hash::from(log.block_hash),
            transaction_hash: Hash::from(log.transaction_hash),
            block_number: log.block_number,
            emitter_addr: log.address.clone(),
        }
    }
}

/// A single SQL column value produced by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl From<&Address> for ColumnValue {
    fn from(value: &Address) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<&crate::domain::Number> for ColumnValue {
    fn from(value: &crate::domain::Number) -> Self {
        ColumnValue::Text(value.to_canonical_string())
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Integer(value)
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        ColumnValue::Integer(i64::from(value))
    }
}

impl From<u32> for ColumnValue {
    fn from(value: u32) -> Self {
        ColumnValue::Integer(i64::from(value))
    }
}

impl From<u8> for ColumnValue {
    fn from(value: u8) -> Self {
        ColumnValue::Integer(i64::from(value))
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Bool(value)
    }
}

/// Behaviour shared by every decoded event record.
pub trait EventRecord {
    fn provenance(&self) -> &Provenance;

    fn provenance_mut(&mut self) -> &mut Provenance;

    /// Variant-specific columns, excluding provenance.
    fn fields(&self) -> Vec<(&'static str, ColumnValue)>;
}

/// Tagged union over every event kind the ingestor tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum DecodedEvent {
    Transfer(erc20::Transfer),
    AccountCreated(thirdweb::AccountCreated),
    CampaignBalanceUpdated(leo::CampaignBalanceUpdated),
    CampaignCreated(leo::CampaignCreated),
    CampaignUpdated(leo::CampaignUpdated),
    MintPosition(seawater::MintPosition),
    BurnPosition(seawater::BurnPosition),
    TransferPosition(seawater::TransferPosition),
    UpdatePositionLiquidity(seawater::UpdatePositionLiquidity),
    CollectFees(seawater::CollectFees),
    NewPool(seawater::NewPool),
    CollectProtocolFees(seawater::CollectProtocolFees),
    Swap1(seawater::Swap1),
    Swap2(seawater::Swap2),
}

macro_rules! each_variant {
    ($value:expr, $ev:ident => $body:expr) => {
        match $value {
            DecodedEvent::Transfer($ev) => $body,
            DecodedEvent::AccountCreated($ev) => $body,
            DecodedEvent::CampaignBalanceUpdated($ev) => $body,
            DecodedEvent::CampaignCreated($ev) => $body,
            DecodedEvent::CampaignUpdated($ev) => $body,
            DecodedEvent::MintPosition($ev) => $body,
            DecodedEvent::BurnPosition($ev) => $body,
            DecodedEvent::TransferPosition($ev) => $body,
            DecodedEvent::UpdatePositionLiquidity($ev) => $body,
            DecodedEvent::CollectFees($ev) => $body,
            DecodedEvent::NewPool($ev) => $body,
            DecodedEvent::CollectProtocolFees($ev) => $body,
            DecodedEvent::Swap1($ev) => $body,
            DecodedEvent::Swap2($ev) => $body,
        }
    };
}

impl DecodedEvent {
    pub fn provenance(&self) -> &Provenance {
        each_variant!(self, ev => ev.provenance())
    }

    pub fn set_provenance(&mut self, provenance: Provenance) {
        each_variant!(self, ev => *ev.provenance_mut() = provenance)
    }

    /// All columns to insert: provenance first, then the variant's own fields.
    pub fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        let p = self.provenance();
        let mut columns = vec![
            ("block_hash", ColumnValue::Text(p.block_hash.to_string())),
            (
                "transaction_hash",
                ColumnValue::Text(p.transaction_hash.to_string()),
            ),
            ("block_number", ColumnValue::Integer(p.block_number as i64)),
            ("emitter_addr", ColumnValue::from(&p.emitter_addr)),
        ];
        columns.extend(each_variant!(self, ev => ev.fields()));
        columns
    }
}

/// Parsed event definitions for every tracked contract.
#[derive(Debug, Clone)]
pub struct EventAbis {
    pub transfer: Event,
    pub account_created: Event,
    pub campaign_balance_updated: Event,
    pub campaign_created: Event,
    pub campaign_updated: Event,
    pub mint_position: Event,
    pub burn_position: Event,
    pub transfer_position: Event,
    pub update_position_liquidity: Event,
    pub collect_fees: Event,
    pub new_pool: Event,
    pub collect_protocol_fees: Event,
    pub swap1: Event,
    pub swap2: Event,
}

const ERC20_ABI: &str = include_str!("abi/erc20.json");
const THIRDWEB_ABI: &str = include_str!("abi/thirdweb.json");
const LEO_ABI: &str = include_str!("abi/leo.json");
const SEAWATER_ABI: &str = include_str!("abi/seawater.json");

impl EventAbis {
    /// Parse the embedded ABI documents.
    ///
    /// # Errors
    /// Returns `DecodeError::Abi` if any document fails to parse or lacks an event.
    pub fn load() -> Result<Self, DecodeError> {
        let erc20 = load_contract("erc20", ERC20_ABI)?;
        let thirdweb = load_contract("thirdweb", THIRDWEB_ABI)?;
        let leo = load_contract("leo", LEO_ABI)?;
        let seawater = load_contract("seawater", SEAWATER_ABI)?;

        Ok(EventAbis {
            transfer: event(&erc20, "Transfer")?,
            account_created: event(&thirdweb, "AccountCreated")?,
            campaign_balance_updated: event(&leo, "CampaignBalanceUpdated")?,
            campaign_created: event(&leo, "CampaignCreated")?,
            campaign_updated: event(&leo, "CampaignUpdated")?,
            mint_position: event(&seawater, "MintPosition")?,
            burn_position: event(&seawater, "BurnPosition")?,
            transfer_position: event(&seawater, "TransferPosition")?,
            update_position_liquidity: event(&seawater, "UpdatePositionLiquidity")?,
            collect_fees: event(&seawater, "CollectFees")?,
            new_pool: event(&seawater, "NewPool")?,
            collect_protocol_fees: event(&seawater, "CollectProtocolFees")?,
            swap1: event(&seawater, "Swap1")?,
            swap2: event(&seawater, "Swap2")?,
        })
    }
}

fn load_contract(name: &str, json: &str) -> Result<Contract, DecodeError> {
    Contract::load(json.as_bytes()).map_err(|e| DecodeError::Abi(format!("{}: {}", name, e)))
}

fn event(contract: &Contract, name: &str) -> Result<Event, DecodeError> {
    contract
        .event(name)
        .cloned()
        .map_err(|e| DecodeError::Abi(format!("{}: {}", name, e)))
}

/// Decode a log's topics and data against an event definition.
pub(crate) fn parse_log(event: &Event, log: &RawLog) -> Result<Vec<LogParam>, DecodeError> {
    let parsed = event.parse_log(ethabi::RawLog {
        topics: log.topics.clone(),
        data: log.data.clone(),
    })?;
    Ok(parsed.params)
}

fn param<'a>(params: &'a [LogParam], name: &'static str) -> Result<&'a Token, DecodeError> {
    params
        .iter()
        .find(|p| p.name == name)
        .map(|p| &p.value)
        .ok_or(DecodeError::MissingParam(name))
}

fn type_name(token: &Token) -> String {
    match token {
        Token::Address(_) => "address".to_string(),
        Token::FixedBytes(b) => format!("bytes{}", b.len()),
        Token::Bytes(_) => "bytes".to_string(),
        Token::Int(_) => "int".to_string(),
        Token::Uint(_) => "uint".to_string(),
        Token::Bool(_) => "bool".to_string(),
        Token::String(_) => "string".to_string(),
        Token::FixedArray(_) | Token::Array(_) => "array".to_string(),
        Token::Tuple(_) => "tuple".to_string(),
    }
}

pub(crate) fn take_address(params: &[LogParam], name: &'static str) -> Result<Address, DecodeError> {
    match param(params, name)? {
        Token::Address(a) => Ok(Address::from(*a)),
        other => Err(DecodeError::UnexpectedType {
            field: name,
            expected: "address",
            actual: type_name(other),
        }),
    }
}

pub(crate) fn take_uint(params: &[LogParam], name: &'static str) -> Result<U256, DecodeError> {
    match param(params, name)? {
        Token::Uint(v) => Ok(*v),
        other => Err(DecodeError::UnexpectedType {
            field: name,
            expected: "uint",
            actual: type_name(other),
        }),
    }
}

pub(crate) fn take_int(params: &[LogParam], name: &'static str) -> Result<U256, DecodeError> {
    match param(params, name)? {
        Token::Int(v) => Ok(*v),
        other => Err(DecodeError::UnexpectedType {
            field: name,
            expected: "int",
            actual: type_name(other),
        }),
    }
}

pub(crate) fn take_bool(params: &[LogParam], name: &'static str) -> Result<bool, DecodeError> {
    match param(params, name)? {
        Token::Bool(v) => Ok(*v),
        other => Err(DecodeError::UnexpectedType {
            field: name,
            expected: "bool",
            actual: type_name(other),
        }),
    }
}

/// Two's complement `int32` carried in a 256-bit word.
pub(crate) fn take_int32(params: &[LogParam], name: &'static str) -> Result<i32, DecodeError> {
    let word = take_int(params, name)?;
    let value = word.low_u32() as i32;
    let extended = if value < 0 {
        (U256::MAX << 32usize) | U256::from(word.low_u32())
    } else {
        U256::from(word.low_u32())
    };
    if extended != word {
        return Err(DecodeError::ValueOutOfRange {
            field: name,
            value: word.to_string(),
        });
    }
    Ok(value)
}

pub(crate) fn take_uint8(params: &[LogParam], name: &'static str) -> Result<u8, DecodeError> {
    let word = take_uint(params, name)?;
    if word > U256::from(u8::MAX) {
        return Err(DecodeError::ValueOutOfRange {
            field: name,
            value: word.to_string(),
        });
    }
    Ok(word.low_u32() as u8)
}

pub(crate) fn take_uint32(params: &[LogParam], name: &'static str) -> Result<u32, DecodeError> {
    let word = take_uint(params, name)?;
    if word > U256::from(u32::MAX) {
        return Err(DecodeError::ValueOutOfRange {
            field: name,
            value: word.to_string(),
        });
    }
    Ok(word.low_u32())
}

/// Position ids are stored as signed 64-bit integers.
pub(crate) fn take_position_id(
    params: &[LogParam],
    name: &'static str,
) -> Result<i64, DecodeError> {
    let word = take_uint(params, name)?;
    if word > U256::from(i64::MAX as u64) {
        return Err(DecodeError::ValueOutOfRange {
            field: name,
            value: word.to_string(),
        });
    }
    Ok(word.low_u64() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_param(name: &str, value: U256) -> LogParam {
        LogParam {
            name: name.to_string(),
            value: Token::Int(value),
        }
    }

    #[test]
    fn test_event_abis_load() {
        let abis = EventAbis::load().unwrap();
        assert_eq!(
            hex::encode(abis.new_pool.signature().as_bytes()),
            "cb076a66f4dca163de39a4023de987ca633a005767c796b3772e3462c573e339"
        );
        assert_eq!(
            hex::encode(abis.transfer.signature().as_bytes()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_load_contract_rejects_garbage() {
        let err = load_contract("broken", "{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Abi(_)));
    }

    #[test]
    fn test_take_int32_sign_extension() {
        let params = vec![
            int_param("neg", U256::MAX - U256::from(19)),
            int_param("pos", U256::from(887272)),
            int_param("wide", U256::from(u64::MAX)),
        ];
        assert_eq!(take_int32(&params, "neg").unwrap(), -20);
        assert_eq!(take_int32(&params, "pos").unwrap(), 887272);
        assert!(matches!(
            take_int32(&params, "wide"),
            Err(DecodeError::ValueOutOfRange { field: "wide", .. })
        ));
    }

    #[test]
    fn test_take_wrong_type_names_expected_and_actual() {
        let params = vec![LogParam {
            name: "pool".to_string(),
            value: Token::Bool(true),
        }];
        match take_address(&params, "pool") {
            Err(DecodeError::UnexpectedType {
                field,
                expected,
                actual,
            }) => {
                assert_eq!(field, "pool");
                assert_eq!(expected, "address");
                assert_eq!(actual, "bool");
            }
            other => panic!("Expected UnexpectedType, got {:?}", other),
        }
        assert_eq!(
            take_uint(&params, "missing"),
            Err(DecodeError::MissingParam("missing"))
        );
    }
}
