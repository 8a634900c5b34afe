//! ERC20 `Transfer` decoding.

use super::{ColumnValue, DecodeError, EventAbis, EventRecord, Provenance};
use crate::datasource::RawLog;
use crate::domain::{Address, Number};
use ethabi::{ParamType, Token};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transfer {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub sender: Address,
    pub recipient: Address,
    pub value: Number,
}

impl EventRecord for Transfer {
    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn provenance_mut(&mut self) -> &mut Provenance {
        &mut self.provenance
    }

    fn fields(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("sender", ColumnValue::from(&self.sender)),
            ("recipient", ColumnValue::from(&self.recipient)),
            ("value", ColumnValue::from(&self.value)),
        ]
    }
}

/// Decode a `Transfer` log.
///
/// ERC721 transfers share the selector but index the token id and carry no
/// data, so topics are read directly and an empty payload decodes as zero.
pub fn decode_transfer(abis: &EventAbis, log: &RawLog) -> Result<Transfer, DecodeError> {
    let value = if log.data.is_empty() {
        Number::zero()
    } else {
        let kinds: Vec<ParamType> = abis
            .transfer
            .inputs
            .iter()
            .filter(|i| !i.indexed)
            .map(|i| i.kind.clone())
            .collect();
        match ethabi::decode(&kinds, &log.data)?.first() {
            Some(Token::Uint(v)) => Number::from_u256(*v),
            Some(other) => {
                return Err(DecodeError::UnexpectedType {
                    field: "value",
                    expected: "uint",
                    actual: format!("{:?}", other),
                })
            }
            None => return Err(DecodeError::MissingParam("value")),
        }
    };

    Ok(Transfer {
        provenance: Provenance::default(),
        sender: Address::from_topic(&log.topic(1)),
        recipient: Address::from_topic(&log.topic(2)),
        value,
    })
}
