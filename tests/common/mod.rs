#![allow(dead_code)]

use ethabi::ethereum_types::{H256, U256};
use ethabi::Token;
use seawater_indexer::datasource::RawLog;
use seawater_indexer::db::init_db;
use seawater_indexer::events::{EventAbis, TopicRouter, TrackedContracts};
use seawater_indexer::{Address, Repository};
use std::sync::Arc;
use tempfile::TempDir;

pub const SEAWATER: &str = "0x40e659f4eb2fda398ce0860afb74701d4977e530";
pub const POOL: &str = "0xe984f758f362d255bd96601929970cef9ff19dd7";

pub async fn setup_repo() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

pub fn addr(s: &str) -> Address {
    Address::parse(s).unwrap()
}

pub fn router() -> TopicRouter {
    TopicRouter::new(
        EventAbis::load().unwrap(),
        &TrackedContracts {
            seawater: addr(SEAWATER),
            thirdweb_factory: addr("0x85e23b94e7f5e9cc1ff78bce78cfb15b81f0df00"),
            leo: addr("0x0000000000000000000000000000000000000abc"),
        },
    )
}

fn address_topic(s: &str) -> H256 {
    H256::from(addr(s).to_h160())
}

fn int_token(value: i64) -> Token {
    let word = if value < 0 {
        !U256::from(value.unsigned_abs()) + U256::one()
    } else {
        U256::from(value as u64)
    };
    Token::Int(word)
}

fn seawater_log(block_number: u64, topics: Vec<H256>, data: Vec<u8>) -> RawLog {
    RawLog {
        address: addr(SEAWATER),
        topics,
        data,
        block_hash: H256::repeat_byte(0xbb),
        block_number,
        transaction_hash: H256::repeat_byte(0xcc),
        log_index: 0,
    }
}

pub fn new_pool_log(block_number: u64, pool: &str, decimals: u8) -> RawLog {
    let abis = EventAbis::load().unwrap();
    seawater_log(
        block_number,
        vec![
            abis.new_pool.signature(),
            address_topic(pool),
            H256::from_low_u64_be(3000),
        ],
        ethabi::encode(&[
            Token::Uint(U256::from(decimals)),
            Token::Uint(U256::from(1u8)),
        ]),
    )
}

pub fn mint_position_log(block_number: u64, id: u64, pool: &str, lower: i32, upper: i32) -> RawLog {
    let abis = EventAbis::load().unwrap();
    seawater_log(
        block_number,
        vec![
            abis.mint_position.signature(),
            H256::from_low_u64_be(id),
            address_topic("0x00000000000000000000000000000000000000ff"),
            address_topic(pool),
        ],
        ethabi::encode(&[int_token(lower.into()), int_token(upper.into())]),
    )
}

pub fn swap1_log(block_number: u64, pool: &str, final_tick: i32) -> RawLog {
    let abis = EventAbis::load().unwrap();
    seawater_log(
        block_number,
        vec![
            abis.swap1.signature(),
            address_topic("0x00000000000000000000000000000000000000ff"),
            address_topic(pool),
        ],
        ethabi::encode(&[
            Token::Bool(false),
            Token::Uint(U256::from(10u64)),
            Token::Uint(U256::from(20u64)),
            int_token(final_tick.into()),
        ]),
    )
}

/// A mint log whose body is too short to decode.
pub fn truncated_mint_log(block_number: u64) -> RawLog {
    let mut log = mint_position_log(block_number, 9, POOL, -10, 10);
    log.data.truncate(10);
    log
}
