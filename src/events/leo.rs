//! Liquidity campaign ("Leo") events.
//!
//! `CampaignCreated` and `CampaignUpdated` pack several fields into single
//! 256-bit words; each field is recovered by shifting past the fields below it
//! and masking to its own width.

use super::{
    param, parse_log, take_address, take_uint, type_name, ColumnValue, DecodeError, EventAbis,
    EventRecord, Provenance,
};
use crate::datasource::RawLog;
use crate::domain::{Address, Data, Number};
use ethabi::ethereum_types::{H160, U256};
use ethabi::{LogParam, Token};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignBalanceUpdated {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub identifier: Data,
    pub new_maximum: Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignCreated {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub identifier: Data,
    pub pool: Address,
    pub token: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub owner: Address,
    /// Unix seconds.
    pub starting: i64,
    pub ending: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignUpdated {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub identifier: Data,
    pub pool: Address,
    pub per_second: Number,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub starting: i64,
    pub ending: i64,
}

impl EventRecord for CampaignBalanceUpdated {
    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn provenance_mut(&mut self) -> &mut Provenance {
        &mut self.provenance
    }

    fn fields(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("identifier", ColumnValue::Text(self.identifier.to_string())),
            ("new_maximum", ColumnValue::from(&self.new_maximum)),
        ]
    }
}

impl EventRecord for CampaignCreated {
    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn provenance_mut(&mut self) -> &mut Provenance {
        &mut self.provenance
    }

    fn fields(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("identifier", ColumnValue::Text(self.identifier.to_string())),
            ("pool", ColumnValue::from(&self.pool)),
            ("token", ColumnValue::from(&self.token)),
            ("tick_lower", ColumnValue::from(self.tick_lower)),
            ("tick_upper", ColumnValue::from(self.tick_upper)),
            ("owner", ColumnValue::from(&self.owner)),
            ("starting", ColumnValue::from(self.starting)),
            ("ending", ColumnValue::from(self.ending)),
        ]
    }
}

impl EventRecord for CampaignUpdated {
    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn provenance_mut(&mut self) -> &mut Provenance {
        &mut self.provenance
    }

    fn fields(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("identifier", ColumnValue::Text(self.identifier.to_string())),
            ("pool", ColumnValue::from(&self.pool)),
            ("per_second", ColumnValue::from(&self.per_second)),
            ("tick_lower", ColumnValue::from(self.tick_lower)),
            ("tick_upper", ColumnValue::from(self.tick_upper)),
            ("starting", ColumnValue::from(self.starting)),
            ("ending", ColumnValue::from(self.ending)),
        ]
    }
}

pub fn decode_campaign_balance_updated(
    abis: &EventAbis,
    log: &RawLog,
) -> Result<CampaignBalanceUpdated, DecodeError> {
    let params = parse_log(&abis.campaign_balance_updated, log)?;
    Ok(CampaignBalanceUpdated {
        provenance: Provenance::default(),
        identifier: take_identifier(&params)?,
        new_maximum: Number::from_u256(take_uint(&params, "newMaximum")?),
    })
}

pub fn decode_campaign_created(
    abis: &EventAbis,
    log: &RawLog,
) -> Result<CampaignCreated, DecodeError> {
    let params = parse_log(&abis.campaign_created, log)?;
    let details = unpack_details(take_uint(&params, "details")?);
    let times = unpack_times(take_uint(&params, "times")?);
    Ok(CampaignCreated {
        provenance: Provenance::default(),
        identifier: take_identifier(&params)?,
        pool: take_address(&params, "pool")?,
        token: take_address(&params, "token")?,
        tick_lower: details.tick_lower,
        tick_upper: details.tick_upper,
        owner: details.owner,
        starting: unix_seconds("starting", times.starting)?,
        ending: unix_seconds("ending", times.ending)?,
    })
}

pub fn decode_campaign_updated(
    abis: &EventAbis,
    log: &RawLog,
) -> Result<CampaignUpdated, DecodeError> {
    let params = parse_log(&abis.campaign_updated, log)?;
    let extras = unpack_extras(take_uint(&params, "extras")?);
    Ok(CampaignUpdated {
        provenance: Provenance::default(),
        identifier: take_identifier(&params)?,
        pool: take_address(&params, "pool")?,
        per_second: Number::from_u256(take_uint(&params, "perSecond")?),
        tick_lower: extras.tick_lower,
        tick_upper: extras.tick_upper,
        starting: unix_seconds("starting", extras.starting)?,
        ending: unix_seconds("ending", extras.ending)?,
    })
}

/// The `bytes8` identifier occupies the leading bytes of its topic.
fn take_identifier(params: &[LogParam]) -> Result<Data, DecodeError> {
    match param(params, "identifier")? {
        Token::FixedBytes(b) if b.len() >= 8 => Ok(Data::from_bytes(&b[..8])),
        other => Err(DecodeError::UnexpectedType {
            field: "identifier",
            expected: "bytes8",
            actual: type_name(other),
        }),
    }
}

fn unix_seconds(field: &'static str, value: u64) -> Result<i64, DecodeError> {
    i64::try_from(value).map_err(|_| DecodeError::ValueOutOfRange {
        field,
        value: value.to_string(),
    })
}

fn bits_u32(word: U256, shift: usize) -> u32 {
    (word >> shift).low_u32()
}

fn bits_u64(word: U256, shift: usize) -> u64 {
    (word >> shift).low_u64()
}

#[derive(Debug, PartialEq, Eq)]
struct Details {
    tick_lower: i32,
    tick_upper: i32,
    owner: Address,
}

#[derive(Debug, PartialEq, Eq)]
struct Times {
    starting: u64,
    ending: u64,
}

#[derive(Debug, PartialEq, Eq)]
struct Extras {
    tick_lower: i32,
    tick_upper: i32,
    starting: u64,
    ending: u64,
}

/// `tickLower:32 | tickUpper:32 | owner:160`, high to low.
fn unpack_details(word: U256) -> Details {
    let mut bytes = [0u8; 32];
    word.to_big_endian(&mut bytes);
    Details {
        tick_lower: bits_u32(word, 160 + 32) as i32,
        tick_upper: bits_u32(word, 160) as i32,
        owner: Address::from(H160::from_slice(&bytes[12..])),
    }
}

/// `starting:64 | ending:64`, high to low.
fn unpack_times(word: U256) -> Times {
    Times {
        starting: bits_u64(word, 64),
        ending: bits_u64(word, 0),
    }
}

/// `tickLower:32 | tickUpper:32 | starting:64 | ending:64`, high to low.
fn unpack_extras(word: U256) -> Extras {
    Extras {
        tick_lower: bits_u32(word, 64 + 64 + 32) as i32,
        tick_upper: bits_u32(word, 64 + 64) as i32,
        starting: bits_u64(word, 64),
        ending: bits_u64(word, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethabi::ethereum_types::H256;

    #[test]
    fn test_unpack_details() {
        let details = unpack_details(U256([
            8612231381554033895,
            429782047290621318,
            431143102912,
            4294967276,
        ]));
        assert_eq!(details.tick_lower, -20);
        assert_eq!(details.tick_upper, 100);
        assert_eq!(
            details.owner.as_str(),
            "0x6221a9c005f6e47eb398fd867784cacfdcfff4e7"
        );
    }

    #[test]
    fn test_unpack_times() {
        let times = unpack_times(U256([545464, 5000, 0, 0]));
        assert_eq!(
            times,
            Times {
                starting: 5000,
                ending: 545464
            }
        );
    }

    #[test]
    fn test_unpack_extras() {
        let extras = unpack_extras(U256([2889, 1888, 85899346119, 0]));
        assert_eq!(
            extras,
            Extras {
                tick_lower: 20,
                tick_upper: 199,
                starting: 1888,
                ending: 2889
            }
        );
    }

    fn word(hex_str: &str) -> H256 {
        H256::from_slice(&hex::decode(hex_str).unwrap())
    }

    #[test]
    fn test_decode_campaign_created() {
        let abis = EventAbis::load().unwrap();
        let data = ethabi::encode(&[
            Token::Uint(U256([
                8612231381554033895,
                429782047290621318,
                431143102912,
                4294967276,
            ])),
            Token::Uint(U256([545464, 5000, 0, 0])),
        ]);
        let log = RawLog {
            address: Address::zero(),
            topics: vec![
                abis.campaign_created.signature(),
                word("1999784708abcdef000000000000000000000000000000000000000000000000"),
                word("000000000000000000000000e984f758f362d255bd96601929970cef9ff19dd7"),
                word("0000000000000000000000003f511b0f5ce567899deee6a3c80a2742272687d0"),
            ],
            data,
            block_hash: H256::zero(),
            block_number: 7,
            transaction_hash: H256::zero(),
            log_index: 0,
        };

        let c = decode_campaign_created(&abis, &log).unwrap();
        assert_eq!(c.identifier.as_str(), "0x1999784708abcdef");
        assert_eq!(c.pool.as_str(), "0xe984f758f362d255bd96601929970cef9ff19dd7");
        assert_eq!(c.token.as_str(), "0x3f511b0f5ce567899deee6a3c80a2742272687d0");
        assert_eq!((c.tick_lower, c.tick_upper), (-20, 100));
        assert_eq!(c.owner.as_str(), "0x6221a9c005f6e47eb398fd867784cacfdcfff4e7");
        assert_eq!((c.starting, c.ending), (5000, 545464));
    }

    #[test]
    fn test_decode_campaign_updated() {
        let abis = EventAbis::load().unwrap();
        let data = ethabi::encode(&[Token::Uint(U256([2889, 1888, 85899346119, 0]))]);
        let log = RawLog {
            address: Address::zero(),
            topics: vec![
                abis.campaign_updated.signature(),
                word("0102030405060708000000000000000000000000000000000000000000000000"),
                word("000000000000000000000000e984f758f362d255bd96601929970cef9ff19dd7"),
                word("00000000000000000000000000000000000000000000000000000000000003e8"),
            ],
            data,
            block_hash: H256::zero(),
            block_number: 8,
            transaction_hash: H256::zero(),
            log_index: 0,
        };

        let u = decode_campaign_updated(&abis, &log).unwrap();
        assert_eq!(u.identifier.as_str(), "0x0102030405060708");
        assert_eq!(u.per_second, Number::from(1000));
        assert_eq!((u.tick_lower, u.tick_upper), (20, 199));
        assert_eq!((u.starting, u.ending), (1888, 2889));
    }
}
