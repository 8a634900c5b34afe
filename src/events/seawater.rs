//! AMM (Seawater) contract events.

use super::{
    parse_log, take_address, take_bool, take_int, take_int32, take_position_id, take_uint,
    take_uint32, take_uint8, ColumnValue, DecodeError, EventAbis, EventRecord, Provenance,
};
use crate::datasource::RawLog;
use crate::domain::{Address, Number};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintPosition {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub pos_id: i64,
    pub owner: Address,
    pub pool: Address,
    pub lower: i32,
    pub upper: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BurnPosition {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub pos_id: i64,
    pub owner: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferPosition {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub from: Address,
    pub to: Address,
    pub pos_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePositionLiquidity {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub pos_id: i64,
    pub token0: Number,
    pub token1: Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectFees {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub pos_id: i64,
    pub pool: Address,
    pub to: Address,
    pub amount0: Number,
    pub amount1: Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPool {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub token: Address,
    pub fee: u32,
    pub decimals: u8,
    pub tick_spacing: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectProtocolFees {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub pool: Address,
    pub to: Address,
    pub amount0: Number,
    pub amount1: Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Swap1 {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub user: Address,
    pub pool: Address,
    pub zero_for_one: bool,
    pub amount0: Number,
    pub amount1: Number,
    pub final_tick: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Swap2 {
    #[serde(flatten)]
    pub provenance: Provenance,
    pub user: Address,
    pub from: Address,
    pub to: Address,
    pub amount_in: Number,
    pub amount_out: Number,
    pub fluid_volume: Number,
    pub final_tick0: i32,
    pub final_tick1: i32,
}

macro_rules! impl_event_record {
    ($ty:ty, |$ev:ident| $fields:expr) => {
        impl EventRecord for $ty {
            fn provenance(&self) -> &Provenance {
                &self.provenance
            }

            fn provenance_mut(&mut self) -> &mut Provenance {
                &mut self.provenance
            }

            fn fields(&self) -> Vec<(&'static str, ColumnValue)> {
                let $ev = self;
                $fields
            }
        }
    };
}

impl_event_record!(MintPosition, |e| vec![
    ("pos_id", ColumnValue::from(e.pos_id)),
    ("owner", ColumnValue::from(&e.owner)),
    ("pool", ColumnValue::from(&e.pool)),
    ("lower", ColumnValue::from(e.lower)),
    ("upper", ColumnValue::from(e.upper)),
]);

impl_event_record!(BurnPosition, |e| vec![
    ("pos_id", ColumnValue::from(e.pos_id)),
    ("owner", ColumnValue::from(&e.owner)),
]);

impl_event_record!(TransferPosition, |e| vec![
    ("from_", ColumnValue::from(&e.from)),
    ("to_", ColumnValue::from(&e.to)),
    ("pos_id", ColumnValue::from(e.pos_id)),
]);

impl_event_record!(UpdatePositionLiquidity, |e| vec![
    ("pos_id", ColumnValue::from(e.pos_id)),
    ("token0", ColumnValue::from(&e.token0)),
    ("token1", ColumnValue::from(&e.token1)),
]);

impl_event_record!(CollectFees, |e| vec![
    ("pos_id", ColumnValue::from(e.pos_id)),
    ("pool", ColumnValue::from(&e.pool)),
    ("to_", ColumnValue::from(&e.to)),
    ("amount0", ColumnValue::from(&e.amount0)),
    ("amount1", ColumnValue::from(&e.amount1)),
]);

impl_event_record!(NewPool, |e| vec![
    ("token", ColumnValue::from(&e.token)),
    ("fee", ColumnValue::from(e.fee)),
    ("decimals", ColumnValue::from(e.decimals)),
    ("tick_spacing", ColumnValue::from(e.tick_spacing)),
]);

impl_event_record!(CollectProtocolFees, |e| vec![
    ("pool", ColumnValue::from(&e.pool)),
    ("to_", ColumnValue::from(&e.to)),
    ("amount0", ColumnValue::from(&e.amount0)),
    ("amount1", ColumnValue::from(&e.amount1)),
]);

impl_event_record!(Swap1, |e| vec![
    ("user_", ColumnValue::from(&e.user)),
    ("pool", ColumnValue::from(&e.pool)),
    ("zero_for_one", ColumnValue::from(e.zero_for_one)),
    ("amount0", ColumnValue::from(&e.amount0)),
    ("amount1", ColumnValue::from(&e.amount1)),
    ("final_tick", ColumnValue::from(e.final_tick)),
]);

impl_event_record!(Swap2, |e| vec![
    ("user_", ColumnValue::from(&e.user)),
    ("from_", ColumnValue::from(&e.from)),
    ("to_", ColumnValue::from(&e.to)),
    ("amount_in", ColumnValue::from(&e.amount_in)),
    ("amount_out", ColumnValue::from(&e.amount_out)),
    ("fluid_volume", ColumnValue::from(&e.fluid_volume)),
    ("final_tick0", ColumnValue::from(e.final_tick0)),
    ("final_tick1", ColumnValue::from(e.final_tick1)),
]);

pub fn decode_mint_position(abis: &EventAbis, log: &RawLog) -> Result<MintPosition, DecodeError> {
    let params = parse_log(&abis.mint_position, log)?;
    Ok(MintPosition {
        provenance: Provenance::default(),
        pos_id: take_position_id(&params, "id")?,
        owner: take_address(&params, "owner")?,
        pool: take_address(&params, "pool")?,
        lower: take_int32(&params, "lower")?,
        upper: take_int32(&params, "upper")?,
    })
}

pub fn decode_burn_position(abis: &EventAbis, log: &RawLog) -> Result<BurnPosition, DecodeError> {
    let params = parse_log(&abis.burn_position, log)?;
    Ok(BurnPosition {
        provenance: Provenance::default(),
        pos_id: take_position_id(&params, "id")?,
        owner: take_address(&params, "owner")?,
    })
}

pub fn decode_transfer_position(
    abis: &EventAbis,
    log: &RawLog,
) -> Result<TransferPosition, DecodeError> {
    let params = parse_log(&abis.transfer_position, log)?;
    Ok(TransferPosition {
        provenance: Provenance::default(),
        from: take_address(&params, "from")?,
        to: take_address(&params, "to")?,
        pos_id: take_position_id(&params, "id")?,
    })
}

pub fn decode_update_position_liquidity(
    abis: &EventAbis,
    log: &RawLog,
) -> Result<UpdatePositionLiquidity, DecodeError> {
    let params = parse_log(&abis.update_position_liquidity, log)?;
    Ok(UpdatePositionLiquidity {
        provenance: Provenance::default(),
        pos_id: take_position_id(&params, "id")?,
        token0: Number::from_i256(take_int(&params, "token0")?),
        token1: Number::from_i256(take_int(&params, "token1")?),
    })
}

pub fn decode_collect_fees(abis: &EventAbis, log: &RawLog) -> Result<CollectFees, DecodeError> {
    let params = parse_log(&abis.collect_fees, log)?;
    Ok(CollectFees {
        provenance: Provenance::default(),
        pos_id: take_position_id(&params, "id")?,
        pool: take_address(&params, "pool")?,
        to: take_address(&params, "to")?,
        amount0: Number::from_u256(take_uint(&params, "amount0")?),
        amount1: Number::from_u256(take_uint(&params, "amount1")?),
    })
}

pub fn decode_new_pool(abis: &EventAbis, log: &RawLog) -> Result<NewPool, DecodeError> {
    let params = parse_log(&abis.new_pool, log)?;
    Ok(NewPool {
        provenance: Provenance::default(),
        token: take_address(&params, "token")?,
        fee: take_uint32(&params, "fee")?,
        decimals: take_uint8(&params, "decimals")?,
        tick_spacing: take_uint8(&params, "tickSpacing")?,
    })
}

pub fn decode_collect_protocol_fees(
    abis: &EventAbis,
    log: &RawLog,
) -> Result<CollectProtocolFees, DecodeError> {
    let params = parse_log(&abis.collect_protocol_fees, log)?;
    Ok(CollectProtocolFees {
        provenance: Provenance::default(),
        pool: take_address(&params, "pool")?,
        to: take_address(&params, "to")?,
        amount0: Number::from_u256(take_uint(&params, "amount0")?),
        amount1: Number::from_u256(take_uint(&params, "amount1")?),
    })
}

pub fn decode_swap1(abis: &EventAbis, log: &RawLog) -> Result<Swap1, DecodeError> {
    let params = parse_log(&abis.swap1, log)?;
    Ok(Swap1 {
        provenance: Provenance::default(),
        user: take_address(&params, "user")?,
        pool: take_address(&params, "pool")?,
        zero_for_one: take_bool(&params, "zeroForOne")?,
        amount0: Number::from_u256(take_uint(&params, "amount0")?),
        amount1: Number::from_u256(take_uint(&params, "amount1")?),
        final_tick: take_int32(&params, "finalTick")?,
    })
}

pub fn decode_swap2(abis: &EventAbis, log: &RawLog) -> Result<Swap2, DecodeError> {
    let params = parse_log(&abis.swap2, log)?;
    Ok(Swap2 {
        provenance: Provenance::default(),
        user: take_address(&params, "user")?,
        from: take_address(&params, "from")?,
        to: take_address(&params, "to")?,
        amount_in: Number::from_u256(take_uint(&params, "amountIn")?),
        amount_out: Number::from_u256(take_uint(&params, "amountOut")?),
        fluid_volume: Number::from_u256(take_uint(&params, "fluidVolume")?),
        final_tick0: take_int32(&params, "finalTick0")?,
        final_tick1: take_int32(&params, "finalTick1")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethabi::ethereum_types::H256;

    fn word(hex_str: &str) -> H256 {
        H256::from_slice(&hex::decode(hex_str).unwrap())
    }

    fn make_log(topics: Vec<H256>, data: &str) -> RawLog {
        RawLog {
            address: Address::zero(),
            topics,
            data: hex::decode(data).unwrap(),
            block_hash: H256::zero(),
            block_number: 1,
            transaction_hash: H256::zero(),
            log_index: 0,
        }
    }

    #[test]
    fn test_decode_mint_position() {
        let abis = EventAbis::load().unwrap();
        let log = make_log(
            vec![
                abis.mint_position.signature(),
                H256::zero(),
                word("000000000000000000000000feb6034fc7df27df18a3a6bad5fb94c0d3dcb6d5"),
                word("0000000000000000000000002f26b901590801476c5bac1debc4e42379127a44"),
            ],
            "00000000000000000000000000000000000000000000000000000000000098d2000000000000000000000000000000000000000000000000000000000000c3bc",
        );
        let m = decode_mint_position(&abis, &log).unwrap();
        assert_eq!(m.pos_id, 0);
        assert_eq!(m.owner.as_str(), "0xfeb6034fc7df27df18a3a6bad5fb94c0d3dcb6d5");
        assert_eq!(m.pool.as_str(), "0x2f26b901590801476c5bac1debc4e42379127a44");
        assert_eq!(m.lower, 39122);
        assert_eq!(m.upper, 50108);
    }

    #[test]
    fn test_decode_mint_position_full_range() {
        let abis = EventAbis::load().unwrap();
        let log = make_log(
            vec![
                abis.mint_position.signature(),
                H256::zero(),
                word("000000000000000000000000feb6034fc7df27df18a3a6bad5fb94c0d3dcb6d5"),
                word("000000000000000000000000e984f758f362d255bd96601929970cef9ff19dd7"),
            ],
            "000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000d89e8",
        );
        let m = decode_mint_position(&abis, &log).unwrap();
        assert_eq!(m.lower, 0);
        assert_eq!(m.upper, 887272);
    }

    #[test]
    fn test_decode_position_id_too_large() {
        let abis = EventAbis::load().unwrap();
        let log = make_log(
            vec![
                abis.burn_position.signature(),
                word("0000000000000000000000000000000000000000000000010000000000000000"),
                word("000000000000000000000000feb6034fc7df27df18a3a6bad5fb94c0d3dcb6d5"),
            ],
            "",
        );
        assert!(matches!(
            decode_burn_position(&abis, &log),
            Err(DecodeError::ValueOutOfRange { field: "id", .. })
        ));
    }

    #[test]
    fn test_decode_new_pool() {
        let abis = EventAbis::load().unwrap();
        let log = make_log(
            vec![
                abis.new_pool.signature(),
                word("0000000000000000000000003f511b0f5ce567899deee6a3c80a2742272687d0"),
                H256::zero(),
            ],
            "00000000000000000000000000000000000000000000000000000000000000060000000000000000000000000000000000000000000000000000000000000001",
        );
        let p = decode_new_pool(&abis, &log).unwrap();
        assert_eq!(p.token.as_str(), "0x3f511b0f5ce567899deee6a3c80a2742272687d0");
        assert_eq!(p.fee, 0);
        assert_eq!(p.decimals, 6);
        assert_eq!(p.tick_spacing, 1);
    }

    #[test]
    fn test_decode_swap1() {
        let abis = EventAbis::load().unwrap();
        let log = make_log(
            vec![
                abis.swap1.signature(),
                word("000000000000000000000000feb6034fc7df27df18a3a6bad5fb94c0d3dcb6d5"),
                word("000000000000000000000000e984f758f362d255bd96601929970cef9ff19dd7"),
            ],
            "000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000010000000000000000000000000000000000000000000000000000000000000064000000000000000000000000000000000000000000000000000000000000a9fe",
        );
        let s = decode_swap1(&abis, &log).unwrap();
        assert_eq!(s.user.as_str(), "0xfeb6034fc7df27df18a3a6bad5fb94c0d3dcb6d5");
        assert_eq!(s.pool.as_str(), "0xe984f758f362d255bd96601929970cef9ff19dd7");
        assert!(!s.zero_for_one);
        assert_eq!(s.amount0, Number::from(1));
        assert_eq!(s.amount1, Number::from(100));
        assert_eq!(s.final_tick, 43518);
    }

    #[test]
    fn test_decode_swap2_negative_tick() {
        let abis = EventAbis::load().unwrap();
        let log = make_log(
            vec![
                abis.swap2.signature(),
                word("000000000000000000000000feb6034fc7df27df18a3a6bad5fb94c0d3dcb6d5"),
                word("00000000000000000000000022b9fa698b68bba071b513959794e9a47d19214c"),
                word("0000000000000000000000006437fdc89ced41941b97a9f1f8992d88718c81c5"),
            ],
            "00000000000000000000000000000000000000000000000ad78ebc5ac6200000000000000000000000000000000000000000000000000000000000001009539600000000000000000000000000000000000000000000000000000002f06f4a04fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffc6a9d0000000000000000000000000000000000000000000000000000000000009656",
        );
        let s = decode_swap2(&abis, &log).unwrap();
        assert_eq!(s.from.as_str(), "0x22b9fa698b68bba071b513959794e9a47d19214c");
        assert_eq!(s.to.as_str(), "0x6437fdc89ced41941b97a9f1f8992d88718c81c5");
        assert_eq!(s.amount_in.to_string(), "200000000000000000000");
        assert_eq!(s.amount_out, Number::from(269046678));
        assert_eq!(s.fluid_volume, Number::from(12623759876));
        assert_eq!(s.final_tick0, -234851);
        assert_eq!(s.final_tick1, 38486);
    }

    #[test]
    fn test_decode_update_position_liquidity_negative() {
        let abis = EventAbis::load().unwrap();
        let log = make_log(
            vec![
                abis.update_position_liquidity.signature(),
                word("0000000000000000000000000000000000000000000000000000000000079b03"),
            ],
            "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff170000000000000000000000000000000000000000000000000000000000000064",
        );
        let u = decode_update_position_liquidity(&abis, &log).unwrap();
        assert_eq!(u.pos_id, 498435);
        assert_eq!(u.token0, Number::from(-233));
        assert_eq!(u.token1, Number::from(100));
    }

    #[test]
    fn test_decode_rejects_wrong_topic_count() {
        let abis = EventAbis::load().unwrap();
        let log = make_log(vec![abis.swap1.signature()], "");
        assert!(decode_swap1(&abis, &log).is_err());
    }
}
