//! Active positions, pool prices and snapshot writes.

use crate::domain::{Address, Number, PoolDetail, Position, PositionSnapshot};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::Repository;

fn decode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

fn address(row: &SqliteRow, column: &str) -> Result<Address, sqlx::Error> {
    Address::parse(&row.try_get::<String, _>(column)?).map_err(decode_err)
}

impl Repository {
    /// Every minted, unburned position with its current owner.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored value is malformed.
    pub async fn active_positions(&self) -> Result<Vec<Position>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT pos_id, pool, owner, lower, upper
            FROM seawater_active_positions_1
            ORDER BY pos_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Position {
                    pool: address(row, "pool")?,
                    id: row.try_get("pos_id")?,
                    owner: address(row, "owner")?,
                    lower: row.try_get("lower")?,
                    upper: row.try_get("upper")?,
                })
            })
            .collect()
    }

    /// Latest final tick and decimals of every pool that has traded.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored value is malformed.
    pub async fn pool_details(&self) -> Result<Vec<PoolDetail>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT pool, final_tick, decimals FROM seawater_final_ticks_decimals_1 ORDER BY pool",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let decimals: i64 = row.try_get("decimals")?;
                Ok(PoolDetail {
                    pool: address(row, "pool")?,
                    final_tick: row.try_get("final_tick")?,
                    decimals: u8::try_from(decimals).map_err(decode_err)?,
                })
            })
            .collect()
    }

    /// Write one reconciliation run from four parallel columns, atomically.
    ///
    /// # Returns
    /// Number of rows inserted
    ///
    /// # Errors
    /// Returns an error if the columns differ in length or any insert fails.
    pub async fn insert_snapshots(
        &self,
        pools: &[Address],
        ids: &[i64],
        amount0s: &[Number],
        amount1s: &[Number],
    ) -> Result<usize, sqlx::Error> {
        let len = pools.len();
        if ids.len() != len || amount0s.len() != len || amount1s.len() != len {
            return Err(sqlx::Error::Protocol(format!(
                "snapshot columns differ in length: pools={} ids={} amount0s={} amount1s={}",
                len,
                ids.len(),
                amount0s.len(),
                amount1s.len()
            )));
        }
        if len == 0 {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for i in 0..len {
            sqlx::query(
                r#"
                INSERT INTO snapshot_positions_log_1 (pool, pos_id, amount0, amount1)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(pools[i].as_str())
            .bind(ids[i])
            .bind(amount0s[i].to_canonical_string())
            .bind(amount1s[i].to_canonical_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(len)
    }

    /// Rows written by the most recent snapshot runs, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored value is malformed.
    pub async fn query_snapshots(&self) -> Result<Vec<PositionSnapshot>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT pool, pos_id, amount0, amount1 FROM snapshot_positions_log_1 ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let amount0: String = row.try_get("amount0")?;
                let amount1: String = row.try_get("amount1")?;
                Ok(PositionSnapshot {
                    pool: address(row, "pool")?,
                    id: row.try_get("pos_id")?,
                    amount0: Number::from_str_canonical(&amount0).map_err(decode_err)?,
                    amount1: Number::from_str_canonical(&amount1).map_err(decode_err)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::db::migrations::init_db;
    use crate::db::Repository;
    use crate::domain::{Address, Hash, Number};
    use crate::events::seawater::{BurnPosition, MintPosition, NewPool, Swap1, Swap2, TransferPosition};
    use crate::events::{DecodedEvent, Provenance};
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn addr(last: u8) -> Address {
        Address::parse(&format!("0x{:040x}", last)).unwrap()
    }

    fn at(block_number: u64) -> Provenance {
        Provenance {
            created_by: None,
            block_hash: Hash::default(),
            transaction_hash: Hash::default(),
            block_number,
            emitter_addr: addr(0xee),
        }
    }

    fn mint(block: u64, id: i64, owner: u8, pool: u8) -> (&'static str, DecodedEvent) {
        (
            "events_seawater_mintposition",
            DecodedEvent::MintPosition(MintPosition {
                provenance: at(block),
                pos_id: id,
                owner: addr(owner),
                pool: addr(pool),
                lower: -100,
                upper: 100,
            }),
        )
    }

    #[tokio::test]
    async fn test_active_positions_view() {
        let (repo, _temp) = setup_test_db().await;
        let staged = vec![
            mint(1, 1, 0x01, 0xa0),
            mint(2, 2, 0x02, 0xa0),
            mint(3, 3, 0x03, 0xb0),
            (
                "events_seawater_burnposition",
                DecodedEvent::BurnPosition(BurnPosition {
                    provenance: at(4),
                    pos_id: 2,
                    owner: addr(0x02),
                }),
            ),
            (
                "events_seawater_transferposition",
                DecodedEvent::TransferPosition(TransferPosition {
                    provenance: at(5),
                    from: addr(0x03),
                    to: addr(0x04),
                    pos_id: 3,
                }),
            ),
            (
                "events_seawater_transferposition",
                DecodedEvent::TransferPosition(TransferPosition {
                    provenance: at(6),
                    from: addr(0x04),
                    to: addr(0x05),
                    pos_id: 3,
                }),
            ),
        ];
        repo.commit_cycle(&staged, Some(6)).await.unwrap();

        let positions = repo.active_positions().await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].id, 1);
        assert_eq!(positions[0].owner, addr(0x01));
        assert_eq!(positions[0].pool, addr(0xa0));
        assert_eq!((positions[0].lower, positions[0].upper), (-100, 100));
        assert_eq!(positions[1].id, 3);
        assert_eq!(positions[1].owner, addr(0x05));
    }

    #[tokio::test]
    async fn test_pool_details_view_uses_latest_swap() {
        let (repo, _temp) = setup_test_db().await;
        let new_pool = |token: u8, decimals: u8| {
            (
                "events_seawater_newpool",
                DecodedEvent::NewPool(NewPool {
                    provenance: at(1),
                    token: addr(token),
                    fee: 0,
                    decimals,
                    tick_spacing: 1,
                }),
            )
        };
        let swap1 = |block: u64, pool: u8, tick: i32| {
            (
                "events_seawater_swap1",
                DecodedEvent::Swap1(Swap1 {
                    provenance: at(block),
                    user: addr(0x01),
                    pool: addr(pool),
                    zero_for_one: false,
                    amount0: Number::from(1),
                    amount1: Number::from(100),
                    final_tick: tick,
                }),
            )
        };
        let staged = vec![
            new_pool(0xa0, 6),
            new_pool(0xb0, 18),
            new_pool(0xc0, 8),
            swap1(2, 0xa0, 100),
            swap1(3, 0xa0, 200),
            swap1(4, 0xb0, 300),
            (
                "events_seawater_swap2",
                DecodedEvent::Swap2(Swap2 {
                    provenance: at(5),
                    user: addr(0x01),
                    from: addr(0xa0),
                    to: addr(0xb0),
                    amount_in: Number::from(1),
                    amount_out: Number::from(1),
                    fluid_volume: Number::from(1),
                    final_tick0: -50,
                    final_tick1: 43518,
                }),
            ),
        ];
        repo.commit_cycle(&staged, Some(5)).await.unwrap();

        let details = repo.pool_details().await.unwrap();
        assert_eq!(details.len(), 2, "pool without swaps has no price");
        assert_eq!(details[0].pool, addr(0xa0));
        assert_eq!(details[0].final_tick, -50);
        assert_eq!(details[0].decimals, 6);
        assert_eq!(details[1].pool, addr(0xb0));
        assert_eq!(details[1].final_tick, 43518);
        assert_eq!(details[1].decimals, 18);
    }

    #[tokio::test]
    async fn test_insert_snapshots() {
        let (repo, _temp) = setup_test_db().await;
        let inserted = repo
            .insert_snapshots(
                &[addr(0xa0), addr(0xb0)],
                &[1, 2],
                &[Number::from(4870325), Number::zero()],
                &[Number::from(265662032), Number::from(7)],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let rows: Vec<_> = repo
            .query_snapshots()
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.pool, s.id, s.amount0, s.amount1))
            .collect();
        assert_eq!(
            rows,
            vec![
                (addr(0xa0), 1, Number::from(4870325), Number::from(265662032)),
                (addr(0xb0), 2, Number::zero(), Number::from(7)),
            ]
        );
    }

    #[tokio::test]
    async fn test_insert_snapshots_rejects_mismatched_columns() {
        let (repo, _temp) = setup_test_db().await;
        let result = repo
            .insert_snapshots(&[addr(0xa0)], &[1, 2], &[Number::zero()], &[Number::zero()])
            .await;
        assert!(matches!(result, Err(sqlx::Error::Protocol(_))));
        assert!(repo.query_snapshots().await.unwrap().is_empty());
    }
}
