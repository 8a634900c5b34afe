//! Thirdweb account factory events.

use super::{parse_log, take_address, ColumnValue, DecodeError, EventAbis, EventRecord, Provenance};
use crate::datasource::RawLog;
use crate::domain::Address;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountCreated {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub account: Address,
    pub account_admin: Address,
}

impl EventRecord for AccountCreated {
    fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn provenance_mut(&mut self) -> &mut Provenance {
        &mut self.provenance
    }

    fn fields(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("account", ColumnValue::from(&self.account)),
            ("account_admin", ColumnValue::from(&self.account_admin)),
        ]
    }
}

pub fn decode_account_created(
    abis: &EventAbis,
    log: &RawLog,
) -> Result<AccountCreated, DecodeError> {
    let params = parse_log(&abis.account_created, log)?;
    Ok(AccountCreated {
        provenance: Provenance::default(),
        account: take_address(&params, "account")?,
        account_admin: take_address(&params, "accountAdmin")?,
    })
}
